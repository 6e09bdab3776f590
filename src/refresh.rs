//! Single-flight background refresh of a materialized view.

use crate::sql::quote::quoted;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use utoipa::ToSchema;

/// Shared in-progress flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct RefreshGate {
    refreshing: Arc<AtomicBool>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate. False if a refresh is already running.
    pub fn try_begin(&self) -> bool {
        self.refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn end(&self) {
        self.refreshing.store(false, Ordering::Release);
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    /// Claim the gate for the lifetime of the returned guard.
    pub fn begin(&self) -> Option<RefreshGuard> {
        self.try_begin().then(|| RefreshGuard { gate: self.clone() })
    }
}

/// Releases the gate on drop, including when the refresh task panics.
#[derive(Debug)]
pub struct RefreshGuard {
    gate: RefreshGate,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.gate.end();
    }
}

#[async_trait]
pub trait Refresh: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn refresh(&self) -> Result<(), sqlx::Error>;
}

/// `REFRESH MATERIALIZED VIEW CONCURRENTLY` on one view.
#[derive(Clone, Debug)]
pub struct MaterializedView {
    pool: PgPool,
    name: String,
}

impl MaterializedView {
    pub fn new(pool: PgPool, name: impl Into<String>) -> Self {
        MaterializedView {
            pool,
            name: name.into(),
        }
    }

    pub fn statement(&self) -> String {
        format!("REFRESH MATERIALIZED VIEW CONCURRENTLY {}", quoted(&self.name))
    }
}

#[async_trait]
impl Refresh for MaterializedView {
    fn name(&self) -> &str {
        &self.name
    }

    async fn refresh(&self) -> Result<(), sqlx::Error> {
        let sql = self.statement();
        tracing::debug!(sql = %sql, "query");
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct RefreshStatus {
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = "Materialized view refresh is already in progress")]
    pub message: String,
}

impl RefreshStatus {
    fn new(status: &str, message: &str) -> Self {
        RefreshStatus {
            status: status.to_string(),
            message: message.to_string(),
        }
    }

    pub fn pending() -> Self {
        Self::new("pending", "Materialized view refresh is already in progress")
    }

    pub fn started() -> Self {
        Self::new("success", "Materialized view refresh initiated")
    }

    pub fn available() -> Self {
        Self::new("available", "Materialized view refresh complete")
    }
}

/// Start a refresh on the runtime unless one is running. Returns immediately.
/// Failures are logged; the gate is released either way.
pub fn spawn_refresh<R: Refresh>(gate: &RefreshGate, refresher: Arc<R>) -> RefreshStatus {
    let Some(guard) = gate.begin() else {
        tracing::debug!(view = refresher.name(), "refresh already in progress");
        return RefreshStatus::pending();
    };
    tokio::spawn(async move {
        let _guard = guard;
        match refresher.refresh().await {
            Ok(()) => tracing::info!(view = refresher.name(), "materialized view refreshed"),
            Err(e) => tracing::warn!(view = refresher.name(), error = %e, "materialized view refresh failed"),
        }
    });
    RefreshStatus::started()
}

pub fn refresh_status(gate: &RefreshGate) -> RefreshStatus {
    if gate.is_refreshing() {
        RefreshStatus::pending()
    } else {
        RefreshStatus::available()
    }
}
