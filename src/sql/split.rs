//! Comma splitting for query-string lists.

use crate::error::QueryError;

/// Split a comma-separated parameter, ignoring commas inside double quotes or `[...]`,
/// so `a:[1,2]::array,"x,y".z:v` yields two items. Blank items are dropped.
/// A quote left open at the end of the input is an error, not one swallowed item.
pub fn split_list(input: &str) -> Result<Vec<&str>, QueryError> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut depth = 0usize;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => depth += 1,
            ']' if !in_quotes => depth = depth.saturating_sub(1),
            ',' if !in_quotes && depth == 0 => {
                items.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err(QueryError::UnterminatedQuote {
            input: input.to_string(),
        });
    }
    items.push(&input[start..]);
    Ok(items.into_iter().map(str::trim).filter(|s| !s.is_empty()).collect())
}
