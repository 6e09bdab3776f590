//! Projection of JSON subpaths into a single synthesized object.

use crate::error::QueryError;
use crate::sql::path::JsonPath;
use crate::sql::quote::literal;

/// Build `jsonb_build_object('<leaf>', jsonb_path_query(<column>, '<jsonpath>'), ...) AS <column>`.
///
/// `column` must be a handler constant; it is emitted verbatim. Leaf keys and jsonpath text
/// are emitted as escaped string literals. Each requested path contributes one field named by
/// its leaf key, so the projected object replaces the original column in the row.
///
/// ```
/// use jsonb_query::sql::build_json_path_select;
///
/// let sql = build_json_path_select(&["grains.os"], "data").unwrap();
/// assert_eq!(sql, "jsonb_build_object('os', jsonb_path_query(data, '$.grains.os')) AS data");
/// ```
pub fn build_json_path_select<S: AsRef<str>>(paths: &[S], column: &str) -> Result<String, QueryError> {
    if paths.is_empty() {
        return Err(QueryError::EmptyPath);
    }
    let mut parts = Vec::with_capacity(paths.len());
    for raw in paths {
        let path = JsonPath::parse(raw.as_ref())?;
        parts.push(format!(
            "{}, jsonb_path_query({}, {})",
            literal(&path.leaf_key()),
            column,
            literal(&path.to_jsonpath())
        ));
    }
    Ok(format!("jsonb_build_object({}) AS {}", parts.join(", "), column))
}
