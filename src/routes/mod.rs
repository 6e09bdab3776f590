//! Routers the embedding service mounts.

pub mod common;
pub mod list;
pub mod refresh;

pub use common::common_routes;
pub use list::list_routes;
pub use refresh::{refresh_routes, RefreshState};
