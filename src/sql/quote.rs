//! Identifier and literal quoting for PostgreSQL.

/// Quote identifier for PostgreSQL (safe: only from handler constants).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Single-quoted string literal with embedded quotes doubled (standard_conforming_strings).
pub fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
