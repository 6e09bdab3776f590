//! JSONB containment filters from `path:value::type` tokens.

use crate::error::QueryError;
use crate::sql::path::JsonPath;
use crate::sql::quote::literal;
use crate::sql::value::FilterValue;

/// Declared type suffix of a filter token. Unknown suffixes fall back to `String`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterType {
    Int,
    Float,
    Bool,
    Array,
    String,
}

impl FilterType {
    pub fn from_suffix(s: &str) -> Self {
        match s {
            "int" => FilterType::Int,
            "float" => FilterType::Float,
            "bool" | "boolean" => FilterType::Bool,
            "array" => FilterType::Array,
            _ => FilterType::String,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterType::Int => "int",
            FilterType::Float => "float",
            FilterType::Bool => "bool",
            FilterType::Array => "array",
            FilterType::String => "string",
        }
    }
}

/// One parsed `path:value::type` token.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterClause {
    pub path: JsonPath,
    pub value: FilterValue,
}

fn malformed(token: &str, reason: &'static str) -> QueryError {
    QueryError::MalformedToken {
        token: token.to_string(),
        reason,
    }
}

/// Path errors carry only the path text; report them against the whole token instead.
fn in_token(token: &str, e: QueryError) -> QueryError {
    let reason = match e {
        QueryError::EmptyPath => "empty path",
        QueryError::UnterminatedQuote { .. } => "unterminated quote in path",
        QueryError::InvalidPath { reason, .. } => reason,
        other => return other,
    };
    malformed(token, reason)
}

/// Strip one pair of surrounding quotes. A quote on only one end is malformed.
fn unquote_value<'t>(token: &str, raw: &'t str) -> Result<&'t str, QueryError> {
    let opens = raw.starts_with('"');
    let closes = raw.len() > 1 && raw.ends_with('"');
    match (opens, closes) {
        (true, true) => Ok(&raw[1..raw.len() - 1]),
        (false, false) => Ok(raw),
        _ => Err(malformed(token, "unterminated quote in value")),
    }
}

/// Byte offsets of every ':' outside double quotes.
fn unquoted_colons(s: &str) -> Vec<usize> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => out.push(i),
            _ => {}
        }
    }
    out
}

fn parse_int(s: &str) -> Option<i64> {
    s.parse().ok()
}

fn parse_float(s: &str) -> Option<f64> {
    // Rust accepts "inf"/"NaN", which have no JSON representation
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// `[a, 1, 2.5, true]` -> mixed array; each element tried as int, float, bool, then string.
fn parse_array(s: &str) -> FilterValue {
    let inner = s.strip_prefix('[').unwrap_or(s);
    let inner = inner.strip_suffix(']').unwrap_or(inner);
    if inner.trim().is_empty() {
        return FilterValue::Array(Vec::new());
    }
    let items = inner
        .split(',')
        .map(str::trim)
        .map(|item| {
            if let Some(n) = parse_int(item) {
                FilterValue::Int(n)
            } else if let Some(f) = parse_float(item) {
                FilterValue::Float(f)
            } else if let Some(b) = parse_bool(item) {
                FilterValue::Bool(b)
            } else {
                FilterValue::String(item.trim_matches('"').to_string())
            }
        })
        .collect();
    FilterValue::Array(items)
}

impl FilterClause {
    pub fn parse(token: &str) -> Result<Self, QueryError> {
        let (rest, suffix) = token
            .rsplit_once("::")
            .ok_or_else(|| malformed(token, "expected 'path:value::type'"))?;
        // A path holds colons only inside quoted keys, so the first unquoted ':' ends it.
        // Everything after belongs to the value, e.g. `eth0:00:50:56:aa:bb:cc`.
        let colon = unquoted_colons(rest)
            .first()
            .copied()
            .ok_or_else(|| malformed(token, "missing ':' between path and value"))?;
        let (raw_path, raw_value) = (&rest[..colon], &rest[colon + 1..]);
        if raw_path.trim().is_empty() {
            return Err(malformed(token, "empty path"));
        }
        let path = JsonPath::parse(raw_path).map_err(|e| in_token(token, e))?;
        if path.keys().is_none() {
            return Err(malformed(token, "array indices are not supported in filter paths"));
        }

        let value = unquote_value(token, raw_value)?;
        let ty = FilterType::from_suffix(suffix.trim());
        let invalid = || QueryError::InvalidValueForType {
            token: token.to_string(),
            value: value.to_string(),
            type_name: ty.name(),
        };
        let value = match ty {
            FilterType::Int => FilterValue::Int(parse_int(value).ok_or_else(invalid)?),
            FilterType::Float => FilterValue::Float(parse_float(value).ok_or_else(invalid)?),
            FilterType::Bool => FilterValue::Bool(parse_bool(value).ok_or_else(invalid)?),
            FilterType::Array => parse_array(value),
            FilterType::String => FilterValue::String(value.to_string()),
        };
        Ok(FilterClause { path, value })
    }
}

/// Fold every token into one filter document. Fails on the first bad token.
pub fn build_filter_document<S: AsRef<str>>(tokens: &[S]) -> Result<FilterValue, QueryError> {
    let mut doc = FilterValue::default();
    for token in tokens {
        let token = token.as_ref();
        let clause = FilterClause::parse(token)?;
        let keys = clause.path.keys().unwrap_or_default();
        doc.insert_at(&keys, clause.value)
            .map_err(|c| QueryError::ConflictingFilterPath {
                token: token.to_string(),
                path: c.path.join("."),
            })?;
    }
    Ok(doc)
}

/// Build `<column> @> '<json>'::jsonb` from filter tokens.
///
/// `column` must be a handler constant. Keys in the JSON are sorted, so the same token set
/// always yields the same SQL. Arrays match by element containment, not by position.
pub fn build_json_path_where<S: AsRef<str>>(tokens: &[S], column: &str) -> Result<String, QueryError> {
    if tokens.is_empty() {
        return Err(malformed("", "no filters given"));
    }
    let doc = build_filter_document(tokens)?;
    let json = doc.to_json()?;
    Ok(format!("{} @> {}::jsonb", column, literal(&json)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(tokens: &[&str]) -> Result<String, QueryError> {
        build_json_path_where(tokens, "data")
    }

    #[test]
    fn multiple_filters_merge_with_sorted_keys() {
        assert_eq!(
            filter(&["grains.id:pcmtest09.example.com::string", "grains.os:RedHat::string", "grains.gtad:true::bool"]).unwrap(),
            r#"data @> '{"grains":{"gtad":true,"id":"pcmtest09.example.com","os":"RedHat"}}'::jsonb"#
        );
    }

    #[test]
    fn quoted_key_with_period() {
        assert_eq!(
            filter(&[r#""grains"."id.test":pcmtest09.example.com::string"#, "grains.os:RedHat::string"]).unwrap(),
            r#"data @> '{"grains":{"id.test":"pcmtest09.example.com","os":"RedHat"}}'::jsonb"#
        );
    }

    #[test]
    fn top_level_keys() {
        assert_eq!(
            filter(&["id:pcmtest09.example.com::string", "os:RedHat::string", "gtad:true::bool"]).unwrap(),
            r#"data @> '{"gtad":true,"id":"pcmtest09.example.com","os":"RedHat"}'::jsonb"#
        );
    }

    #[test]
    fn single_string_filter() {
        assert_eq!(filter(&["grains.id:test::string"]).unwrap(), r#"data @> '{"grains":{"id":"test"}}'::jsonb"#);
    }

    #[test]
    fn typed_scalars() {
        assert_eq!(filter(&["grains.efi:false::bool"]).unwrap(), r#"data @> '{"grains":{"efi":false}}'::jsonb"#);
        assert_eq!(filter(&["grains.efi:true::boolean"]).unwrap(), r#"data @> '{"grains":{"efi":true}}'::jsonb"#);
        assert_eq!(filter(&["grains.gid:0::int"]).unwrap(), r#"data @> '{"grains":{"gid":0}}'::jsonb"#);
        assert_eq!(
            filter(&["grains.memory.size:16.1::float"]).unwrap(),
            r#"data @> '{"grains":{"memory":{"size":16.1}}}'::jsonb"#
        );
    }

    #[test]
    fn nested_objects() {
        assert_eq!(
            filter(&["grains.dns.nameservers:143.215.77.4::string"]).unwrap(),
            r#"data @> '{"grains":{"dns":{"nameservers":"143.215.77.4"}}}'::jsonb"#
        );
    }

    #[test]
    fn empty_array_is_an_array() {
        assert_eq!(
            filter(&["grains.dns.search:gatech.edu::string", "grains.dns.sortlist:[]::array"]).unwrap(),
            r#"data @> '{"grains":{"dns":{"search":"gatech.edu","sortlist":[]}}}'::jsonb"#
        );
    }

    #[test]
    fn array_elements_are_coerced() {
        assert_eq!(
            filter(&["grains.dns.ip4_nameservers:[143.215.77.4,130.207.244.251]::array"]).unwrap(),
            r#"data @> '{"grains":{"dns":{"ip4_nameservers":["143.215.77.4","130.207.244.251"]}}}'::jsonb"#
        );
        assert_eq!(
            filter(&[r#"tags:[1, 2.5, true, "x", nan]::array"#]).unwrap(),
            r#"data @> '{"tags":[1,2.5,true,"x","nan"]}'::jsonb"#
        );
    }

    #[test]
    fn colons_in_values() {
        assert_eq!(
            filter(&[r#"schedule.at:"10:30"::string"#]).unwrap(),
            r#"data @> '{"schedule":{"at":"10:30"}}'::jsonb"#
        );
        assert_eq!(
            filter(&["schedule.at:10:30::string"]).unwrap(),
            r#"data @> '{"schedule":{"at":"10:30"}}'::jsonb"#
        );
        assert_eq!(
            filter(&["grains.hwaddr_interfaces.eth0:00:50:56:aa:bb:cc::string"]).unwrap(),
            r#"data @> '{"grains":{"hwaddr_interfaces":{"eth0":"00:50:56:aa:bb:cc"}}}'::jsonb"#
        );
        assert_eq!(
            filter(&[r#"config."time:zone":UTC::string"#]).unwrap(),
            r#"data @> '{"config":{"time:zone":"UTC"}}'::jsonb"#
        );
    }

    #[test]
    fn one_sided_value_quotes_are_rejected() {
        for token in [r#"grains.os:"Red::string"#, r#"grains.os:Red"::string"#, r#"grains.os:"::string"#] {
            let err = filter(&[token]).unwrap_err();
            assert!(matches!(err, QueryError::MalformedToken { .. }), "{token}");
            assert!(err.to_string().contains(token));
        }
        assert_eq!(filter(&[r#"grains.os:""::string"#]).unwrap(), r#"data @> '{"grains":{"os":""}}'::jsonb"#);
    }

    #[test]
    fn path_errors_name_the_whole_token() {
        let err = filter(&["grains..id:x::string"]).unwrap_err();
        assert!(matches!(err, QueryError::MalformedToken { .. }));
        assert!(err.to_string().contains("grains..id:x::string"));
        let err = filter(&["grains.ip[x]:1::string"]).unwrap_err();
        assert!(err.to_string().contains("grains.ip[x]:1::string"));
    }

    #[test]
    fn unknown_type_defaults_to_string_and_quotes_are_trimmed() {
        assert_eq!(filter(&[r#"os:"RedHat"::text"#]).unwrap(), r#"data @> '{"os":"RedHat"}'::jsonb"#);
        assert_eq!(filter(&["gid:5::"]).unwrap(), r#"data @> '{"gid":"5"}'::jsonb"#);
    }

    #[test]
    fn single_quotes_in_values_are_escaped() {
        assert_eq!(
            filter(&["owner:o'brien::string"]).unwrap(),
            r#"data @> '{"owner":"o''brien"}'::jsonb"#
        );
    }

    #[test]
    fn deterministic_output() {
        let tokens = ["b.y:1::int", "a:x::string", "b.x:true::bool"];
        let mut reversed = tokens;
        reversed.reverse();
        assert_eq!(filter(&tokens).unwrap(), filter(&tokens).unwrap());
        assert_eq!(filter(&tokens).unwrap(), filter(&reversed).unwrap());
    }

    #[test]
    fn malformed_tokens() {
        assert!(matches!(
            filter(&["grains.id:pcmtest09.example.com:string"]),
            Err(QueryError::MalformedToken { .. })
        ));
        assert!(matches!(filter(&["::string"]), Err(QueryError::MalformedToken { .. })));
        assert!(matches!(filter(&["grains.id::string"]), Err(QueryError::MalformedToken { .. })));
        assert!(matches!(filter(&["books[0].title:x::string"]), Err(QueryError::MalformedToken { .. })));
        assert!(matches!(filter(&[""]), Err(QueryError::MalformedToken { .. })));
        assert!(filter(&[]).is_err());
    }

    #[test]
    fn coercion_failures_name_the_token() {
        let err = filter(&["grains.gid:zero::int"]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidValueForType { type_name: "int", .. }));
        assert!(err.to_string().contains("grains.gid:zero::int"));
        assert!(filter(&["grains.size:big::float"]).is_err());
        assert!(filter(&["grains.size:inf::float"]).is_err());
        assert!(filter(&["grains.efi:TRUE::bool"]).is_err());
    }

    #[test]
    fn strict_prefix_paths_conflict() {
        assert!(matches!(
            filter(&["grains.dns.search:x::string", "grains.dns:y::string"]),
            Err(QueryError::ConflictingFilterPath { .. })
        ));
        assert!(matches!(
            filter(&["grains.dns:y::string", "grains.dns.search:x::string"]),
            Err(QueryError::ConflictingFilterPath { .. })
        ));
    }

    #[test]
    fn hostile_paths_error_instead_of_panicking() {
        assert!(filter(&[r#""grains.id:x::string"#]).is_err());
        assert!(filter(&["grains..id:x::string"]).is_err());
        assert!(filter(&["ü.ß:✓::string"]).is_ok());
    }
}
