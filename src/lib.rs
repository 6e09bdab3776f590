//! JSONB query layer: turns list-endpoint query strings into parameterized PostgreSQL.

pub mod config;
pub mod error;
pub mod handlers;
pub mod pagination;
pub mod refresh;
pub mod response;
pub mod routes;
pub mod sql;
pub mod state;

pub use config::PageLimits;
pub use error::{AppError, QueryError};
pub use handlers::{JsonParams, ListEndpoint};
pub use pagination::{PageRequest, PageUrl};
pub use refresh::{refresh_status, spawn_refresh, MaterializedView, Refresh, RefreshGate, RefreshStatus};
pub use response::{Page, Paging};
pub use routes::{common_routes, list_routes, refresh_routes};
pub use sql::{
    build_json_path_select, build_json_path_where, translate_wildcards, validate_order_by, JsonPath,
    ListQuery, ListSpec,
};
pub use state::AppState;
