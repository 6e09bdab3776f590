//! ORDER BY validation against a column whitelist and declared JSON leaf keys.

use crate::error::QueryError;
use crate::sql::path::JsonPath;
use crate::sql::quote::literal;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(QueryError::InvalidSortDirection {
                direction: other.to_string(),
            }),
        }
    }
}

/// One validated sort term. `expression` is either a whitelisted column name or a
/// `jsonb_extract_path_text(...)` call, never raw client text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderTerm {
    pub expression: String,
    pub direction: SortDirection,
}

impl fmt::Display for OrderTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.expression, self.direction.as_sql())
    }
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(s)
}

/// Leaf keys of the declared JSON paths. Blank entries are skipped so an absent
/// `jsonpath` parameter (split into `[""]`) declares nothing.
fn leaf_keys<P: AsRef<str>>(json_paths: &[P]) -> Result<HashSet<String>, QueryError> {
    let mut keys = HashSet::new();
    for raw in json_paths {
        let raw = raw.as_ref();
        if raw.trim().is_empty() {
            continue;
        }
        keys.insert(JsonPath::parse(raw)?.leaf_key());
    }
    Ok(keys)
}

/// Parse and validate `column [asc|desc], ...`.
///
/// A whitelist match wins; otherwise the column must be one of the declared leaf keys, bare or
/// double-quoted, and is rewritten to `jsonb_extract_path_text(<json_column>, '<leaf>')`.
/// Two declared paths with the same leaf are indistinguishable here.
pub fn parse_order_by<S: AsRef<str>, P: AsRef<str>>(
    order_by: &str,
    valid_columns: &[S],
    json_column: &str,
    json_paths: &[P],
) -> Result<Vec<OrderTerm>, QueryError> {
    let whitelist: HashSet<&str> = valid_columns.iter().map(AsRef::as_ref).collect();
    let leaves = leaf_keys(json_paths)?;
    let mut terms = Vec::new();

    for part in order_by.split(',') {
        let words: Vec<&str> = part.split_whitespace().collect();
        let (column, direction) = match words.as_slice() {
            [] => continue,
            [column] => (*column, SortDirection::Asc),
            [column, direction] => (*column, direction.parse()?),
            [_, _, extra, ..] => {
                return Err(QueryError::InvalidSortDirection {
                    direction: (*extra).to_string(),
                })
            }
        };

        let expression = if whitelist.contains(column) {
            column.to_string()
        } else if let Some(leaf) = [column, strip_quotes(column)].into_iter().find(|c| leaves.contains(*c)) {
            // The projected object is keyed by leaf, so the leaf is one top-level key even when it contains '.'.
            format!("jsonb_extract_path_text({}, {})", json_column, literal(leaf))
        } else {
            return Err(QueryError::InvalidColumn {
                column: column.to_string(),
                valid: valid_columns.iter().map(|c| c.as_ref().to_string()).collect(),
            });
        };
        terms.push(OrderTerm { expression, direction });
    }
    Ok(terms)
}

/// Validated ORDER BY body (without the keyword). Empty input yields an empty string;
/// the caller applies its own default ordering.
pub fn validate_order_by<S: AsRef<str>, P: AsRef<str>>(
    order_by: &str,
    valid_columns: &[S],
    json_column: &str,
    json_paths: &[P],
) -> Result<String, QueryError> {
    let terms = parse_order_by(order_by, valid_columns, json_column, json_paths)?;
    Ok(terms.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))
}
