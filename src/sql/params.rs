//! Bind values for list statements. Every value travels as text; the placeholder carries the cast.

use chrono::{DateTime, Utc};
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

/// A value bound to a `$n` placeholder.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlParam {
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl SqlParam {
    /// SQL cast applied to the placeholder so the text value binds as the column's type.
    pub fn cast(&self) -> Option<&'static str> {
        match self {
            SqlParam::Text(_) => None,
            SqlParam::Bool(_) => Some("boolean"),
            SqlParam::Timestamp(_) => Some("timestamptz"),
        }
    }

    /// `$n` or `$n::type`.
    pub fn placeholder(&self, n: usize) -> String {
        match self.cast() {
            Some(t) => format!("${}::{}", n, t),
            None => format!("${}", n),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            SqlParam::Text(s) => s.clone(),
            SqlParam::Bool(b) => b.to_string(),
            SqlParam::Timestamp(t) => t.to_rfc3339(),
        }
    }
}

impl From<&str> for SqlParam {
    fn from(s: &str) -> Self {
        SqlParam::Text(s.to_string())
    }
}

impl From<bool> for SqlParam {
    fn from(b: bool) -> Self {
        SqlParam::Bool(b)
    }
}

impl From<DateTime<Utc>> for SqlParam {
    fn from(t: DateTime<Utc>) -> Self {
        SqlParam::Timestamp(t)
    }
}

impl<'q> Encode<'q, Postgres> for SqlParam {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        let text = self.to_text();
        <&str as Encode<Postgres>>::encode_by_ref(&text.as_str(), buf)
    }
}

impl sqlx::Type<Postgres> for SqlParam {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn placeholders_carry_casts() {
        assert_eq!(SqlParam::from("x").placeholder(1), "$1");
        assert_eq!(SqlParam::from(true).placeholder(2), "$2::boolean");
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(SqlParam::from(t).placeholder(3), "$3::timestamptz");
    }

    #[test]
    fn text_forms() {
        assert_eq!(SqlParam::from(false).to_text(), "false");
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(SqlParam::from(t).to_text(), "2024-05-01T12:00:00+00:00");
    }
}
