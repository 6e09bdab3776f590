//! GET/POST `/refresh` for one materialized view.

use crate::refresh::{refresh_status, spawn_refresh, Refresh, RefreshGate, RefreshStatus};
use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

pub struct RefreshState<R> {
    pub gate: RefreshGate,
    pub refresher: Arc<R>,
}

impl<R> Clone for RefreshState<R> {
    fn clone(&self) -> Self {
        RefreshState {
            gate: self.gate.clone(),
            refresher: Arc::clone(&self.refresher),
        }
    }
}

async fn status<R: Refresh>(State(state): State<RefreshState<R>>) -> Json<RefreshStatus> {
    let status = refresh_status(&state.gate);
    tracing::debug!(view = state.refresher.name(), status = %status.status, "refresh status");
    Json(status)
}

async fn start<R: Refresh>(State(state): State<RefreshState<R>>) -> Json<RefreshStatus> {
    let status = spawn_refresh(&state.gate, Arc::clone(&state.refresher));
    tracing::debug!(view = state.refresher.name(), status = %status.status, "refresh requested");
    Json(status)
}

/// GET reports `pending`/`available`; POST starts a refresh (`success`) or reports `pending`.
/// Both answer 200.
pub fn refresh_routes<R: Refresh>(gate: RefreshGate, refresher: Arc<R>) -> Router {
    Router::new()
        .route("/refresh", get(status::<R>).post(start::<R>))
        .with_state(RefreshState { gate, refresher })
}
