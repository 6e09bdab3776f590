//! Glob-style text matching (`*`, `?`) for plain text columns.

/// How a text filter compares against its column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextMatch {
    /// `col = $n`
    Exact(String),
    /// `col LIKE $n`, pattern already translated
    Like(String),
}

impl TextMatch {
    pub fn operator(&self) -> &'static str {
        match self {
            TextMatch::Exact(_) => "=",
            TextMatch::Like(_) => "LIKE",
        }
    }

    pub fn into_value(self) -> String {
        match self {
            TextMatch::Exact(v) | TextMatch::Like(v) => v,
        }
    }
}

/// `*` -> `%`, `?` -> `_`. Literal `%`, `_` and `\` are escaped with PostgreSQL's default
/// LIKE escape character so they keep matching themselves.
pub fn glob_to_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    for c in input.chars() {
        match c {
            '*' => out.push('%'),
            '?' => out.push('_'),
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out
}

/// Exact match unless the input contains a wildcard.
pub fn translate_wildcards(input: &str) -> TextMatch {
    if input.contains(['*', '?']) {
        TextMatch::Like(glob_to_like(input))
    } else {
        TextMatch::Exact(input.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_exact() {
        assert_eq!(translate_wildcards("minion01"), TextMatch::Exact("minion01".into()));
        assert_eq!(translate_wildcards("100%_done"), TextMatch::Exact("100%_done".into()));
    }

    #[test]
    fn star_and_question_mark() {
        assert_eq!(translate_wildcards("web*"), TextMatch::Like("web%".into()));
        assert_eq!(translate_wildcards("web0?"), TextMatch::Like("web0_".into()));
        assert_eq!(translate_wildcards("*db?.example.com"), TextMatch::Like("%db_.example.com".into()));
    }

    #[test]
    fn literal_like_metacharacters_are_escaped() {
        assert_eq!(glob_to_like("salt_minion*"), "salt\\_minion%");
        assert_eq!(glob_to_like("50%*"), "50\\%%");
        assert_eq!(glob_to_like("a\\b?"), "a\\\\b_");
    }

    #[test]
    fn operator_follows_variant() {
        assert_eq!(translate_wildcards("a*").operator(), "LIKE");
        assert_eq!(translate_wildcards("a").operator(), "=");
        assert_eq!(translate_wildcards("a*").into_value(), "a%");
    }
}
