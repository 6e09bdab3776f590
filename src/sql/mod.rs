//! Query-string to SQL fragments: JSON path projection, JSONB containment filters,
//! validated ordering and glob matching. Column identifiers always come from the caller's
//! constants; client text only ever reaches the output as escaped literals or bound parameters.

mod builder;
pub mod filter;
pub mod order;
pub mod params;
pub mod path;
pub mod quote;
pub mod select;
pub mod split;
pub mod value;
pub mod wildcard;

pub use builder::*;
pub use filter::{build_filter_document, build_json_path_where, FilterClause, FilterType};
pub use order::{parse_order_by, validate_order_by, OrderTerm, SortDirection};
pub use params::*;
pub use path::{JsonPath, Segment};
pub use select::build_json_path_select;
pub use split::split_list;
pub use value::FilterValue;
pub use wildcard::{glob_to_like, translate_wildcards, TextMatch};
