//! Dotted JSON path parsing: `grains.os`, `store."book.author"`, `store.books[0].title`.

use crate::error::QueryError;
use std::fmt;
use std::str::FromStr;

/// One step of a JSON path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Parsed path with quotes stripped. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

/// Keys that are not plain identifiers must be double-quoted in both dotted and jsonpath notation.
fn needs_quotes(key: &str) -> bool {
    match key.chars().next() {
        None => true,
        Some(c) if c.is_ascii_digit() => true,
        _ => !key.chars().all(|c| c.is_alphanumeric() || c == '_'),
    }
}

fn push_quoted(out: &mut String, key: &str) {
    out.push('"');
    for c in key.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

impl JsonPath {
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let input = input.trim();
        let invalid = |reason: &'static str| QueryError::InvalidPath {
            input: input.to_string(),
            reason,
        };
        let mut segments = Vec::new();
        let mut chars = input.chars().peekable();
        // true at the start and right after a '.'
        let mut expect_segment = true;

        while let Some(&c) = chars.peek() {
            match c {
                '.' => {
                    if expect_segment {
                        return Err(invalid("empty segment"));
                    }
                    chars.next();
                    expect_segment = true;
                }
                '"' => {
                    if !expect_segment {
                        return Err(invalid("quote must start a segment"));
                    }
                    chars.next();
                    let mut key = String::new();
                    let mut closed = false;
                    while let Some(c) = chars.next() {
                        match c {
                            '"' => {
                                closed = true;
                                break;
                            }
                            '\\' => match chars.next() {
                                Some(escaped) => key.push(escaped),
                                None => break,
                            },
                            other => key.push(other),
                        }
                    }
                    if !closed {
                        return Err(QueryError::UnterminatedQuote {
                            input: input.to_string(),
                        });
                    }
                    segments.push(Segment::Key(key));
                    expect_segment = false;
                }
                '[' => {
                    chars.next();
                    let mut digits = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        digits.push(c);
                    }
                    if !closed {
                        return Err(invalid("unterminated array index"));
                    }
                    let index = digits
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| invalid("array index must be a non-negative integer"))?;
                    segments.push(Segment::Index(index));
                    expect_segment = false;
                }
                ']' => return Err(invalid("unexpected ']'")),
                _ => {
                    if !expect_segment {
                        return Err(invalid("missing '.' between segments"));
                    }
                    let mut key = String::new();
                    while let Some(&c) = chars.peek() {
                        if matches!(c, '.' | '[' | ']' | '"') {
                            break;
                        }
                        key.push(c);
                        chars.next();
                    }
                    segments.push(Segment::Key(key));
                    expect_segment = false;
                }
            }
        }

        if segments.is_empty() {
            return Err(QueryError::EmptyPath);
        }
        if expect_segment {
            return Err(invalid("trailing '.'"));
        }
        Ok(JsonPath { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn leaf(&self) -> &Segment {
        // parse() guarantees at least one segment
        &self.segments[self.segments.len() - 1]
    }

    /// Final segment as text, e.g. `os` for `grains.os`.
    pub fn leaf_key(&self) -> String {
        match self.leaf() {
            Segment::Key(k) => k.clone(),
            Segment::Index(i) => format!("[{}]", i),
        }
    }

    /// Object keys only; `None` when the path contains an array index.
    pub fn keys(&self) -> Option<Vec<&str>> {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Key(k) => Some(k.as_str()),
                Segment::Index(_) => None,
            })
            .collect()
    }

    /// PostgreSQL jsonpath literal body, e.g. `$.config."app-name"` or `$.books[0].title`.
    pub fn to_jsonpath(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.segments {
            match segment {
                Segment::Key(k) => {
                    out.push('.');
                    if needs_quotes(k) {
                        push_quoted(&mut out, k);
                    } else {
                        out.push_str(k);
                    }
                }
                Segment::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
            }
        }
        out
    }
}

/// Dotted notation that parses back to the same path.
impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(k) => {
                    if i > 0 {
                        out.push('.');
                    }
                    if needs_quotes(k) {
                        push_quoted(&mut out, k);
                    } else {
                        out.push_str(k);
                    }
                }
                Segment::Index(idx) => {
                    out.push('[');
                    out.push_str(&idx.to_string());
                    out.push(']');
                }
            }
        }
        f.write_str(&out)
    }
}

impl FromStr for JsonPath {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JsonPath::parse(s)
    }
}
