//! Mounts a [`ListEndpoint`] as a GET route.

use crate::error::AppError;
use crate::handlers::ListEndpoint;
use crate::pagination::PageUrl;
use crate::response::Page;
use crate::state::AppState;
use axum::{
    extract::{OriginalUri, Query, State},
    http::HeaderMap,
    routing::get,
    Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
struct ListState {
    app: AppState,
    endpoint: Arc<ListEndpoint>,
}

async fn list(
    State(state): State<ListState>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Page<Value>, AppError> {
    let url = PageUrl::from_request(&headers, &uri, state.endpoint.per_page_param);
    state.endpoint.list(&state.app.pool, &params, &url).await
}

pub fn list_routes(state: AppState, path: &str, endpoint: ListEndpoint) -> Router {
    Router::new().route(path, get(list)).with_state(ListState {
        app: state,
        endpoint: Arc::new(endpoint),
    })
}
