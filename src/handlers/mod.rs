//! HTTP-facing list handling shared by every paginated endpoint.

pub mod list;
pub use list::*;
