//! Per-endpoint pagination limits. Defaults can be overridden from the environment,
//! e.g. `SALT_CACHE_MAX_PER_PAGE=500` for a handler using prefix `SALT_CACHE`.

use serde::Deserialize;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageLimits {
    /// Used when the request carries no (or an unusable) page size.
    pub default_per_page: u32,
    /// Absolute cap for this endpoint.
    pub max_per_page: u32,
    /// Cap when large detail columns are selected.
    pub heavy_per_page: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        PageLimits::new(50, 1000, 10)
    }
}

fn env_override<T: FromStr>(prefix: &str, name: &str) -> Option<T> {
    let key = format!("{}_{}", prefix, name);
    let raw = std::env::var(&key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("{}: '{}' is not a valid number, ignoring", key, raw);
            None
        }
    }
}

impl PageLimits {
    pub const fn new(default_per_page: u32, max_per_page: u32, heavy_per_page: u32) -> Self {
        PageLimits {
            default_per_page,
            max_per_page,
            heavy_per_page,
        }
    }

    /// Apply `<PREFIX>_DEFAULT_PER_PAGE`, `<PREFIX>_MAX_PER_PAGE` and `<PREFIX>_HEAVY_PER_PAGE`.
    pub fn with_env_overrides(self, prefix: &str) -> Self {
        PageLimits {
            default_per_page: env_override(prefix, "DEFAULT_PER_PAGE").unwrap_or(self.default_per_page),
            max_per_page: env_override(prefix, "MAX_PER_PAGE").unwrap_or(self.max_per_page),
            heavy_per_page: env_override(prefix, "HEAVY_PER_PAGE").unwrap_or(self.heavy_per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(PageLimits::default(), PageLimits::new(50, 1000, 10));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let limits: PageLimits = serde_json::from_str(r#"{ "max_per_page": 50 }"#).unwrap();
        assert_eq!(limits, PageLimits::new(50, 50, 10));
    }

    #[test]
    fn env_overrides() {
        std::env::set_var("JSONB_QUERY_TEST_MAX_PER_PAGE", "200");
        std::env::set_var("JSONB_QUERY_TEST_HEAVY_PER_PAGE", "lots");
        let limits = PageLimits::default().with_env_overrides("JSONB_QUERY_TEST");
        assert_eq!(limits, PageLimits::new(50, 200, 10));
    }
}
