//! Shared application state for all routes.

use crate::refresh::RefreshGate;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Shared with the refresh routes so readiness can report an in-flight refresh.
    pub refresh: RefreshGate,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        AppState {
            pool,
            refresh: RefreshGate::new(),
        }
    }
}
