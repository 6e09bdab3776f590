//! Query-string driven list endpoints: parameters to [`ListQuery`], then one paginated fetch.

use crate::error::{AppError, QueryError};
use crate::pagination::{PageRequest, PageUrl};
use crate::response::Page;
use crate::sql::{ListQuery, ListSpec};
use chrono::{TimeDelta, Utc};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;

/// Query parameters that address a JSONB column.
#[derive(Clone, Debug)]
pub struct JsonParams {
    pub column: &'static str,
    /// Comma-separated subpaths to project, e.g. `jsonpath=grains.os,grains.kernel`.
    pub path_param: &'static str,
    /// Comma-separated containment tokens, e.g. `jsonpath_filter=grains.os:RedHat::string`.
    pub filter_param: &'static str,
}

/// Declares how one endpoint maps its query string onto a [`ListSpec`].
#[derive(Clone, Debug)]
pub struct ListEndpoint {
    pub spec: ListSpec,
    /// Plural noun for the empty-page message, e.g. `salt_events`.
    pub noun: &'static str,
    /// `per_page` on most endpoints, `limit` on some.
    pub per_page_param: &'static str,
    /// (query parameter, column) pairs matched exactly or by glob.
    pub text_filters: &'static [(&'static str, &'static str)],
    /// (query parameter, column) pairs compared as booleans.
    pub bool_filters: &'static [(&'static str, &'static str)],
    /// (query parameter, column) pairs; a true flag selects the column whole.
    pub load_flags: &'static [(&'static str, &'static str)],
    pub json: Option<JsonParams>,
    /// Column for `since`/`until`.
    pub time_column: Option<&'static str>,
    /// Look-back applied when `since` is absent.
    pub default_window: Option<TimeDelta>,
}

/// Boolean query flags: `1 t T TRUE true True` and `0 f F FALSE false False`.
/// Anything else is treated as absent.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn param<'p>(params: &'p HashMap<String, String>, name: &str) -> Option<&'p str> {
    params.get(name).map(|v| v.as_str()).filter(|v| !v.trim().is_empty())
}

impl ListEndpoint {
    /// Build the query and effective page request without touching the database.
    pub fn build<'a>(
        &'a self,
        params: &HashMap<String, String>,
    ) -> Result<(ListQuery<'a>, PageRequest), QueryError> {
        let mut q = ListQuery::new(&self.spec);

        let projection = self
            .json
            .as_ref()
            .and_then(|j| param(params, j.path_param).map(|raw| (j, raw)));

        for (name, column) in self.load_flags {
            let Some(raw) = param(params, name) else { continue };
            let load = parse_flag(raw).unwrap_or_else(|| {
                tracing::debug!(param = *name, value = raw, "invalid flag value, defaulting to false");
                false
            });
            // A projection of the same column replaces loading it whole.
            let projected = projection.is_some_and(|(j, _)| j.column == *column);
            if load && !projected {
                q.include_column(column)?;
            }
        }

        if let Some((j, raw)) = projection {
            q.project_json_paths(j.column, raw)?;
        }

        for (name, column) in self.text_filters {
            if let Some(value) = param(params, name) {
                q.filter_text(column, value)?;
                tracing::debug!(param = *name, value, "applied text filter");
            }
        }

        for (name, column) in self.bool_filters {
            if let Some(raw) = param(params, name) {
                let value = parse_flag(raw).ok_or_else(|| QueryError::InvalidValueForType {
                    token: format!("{}={}", name, raw),
                    value: raw.to_string(),
                    type_name: "bool",
                })?;
                q.filter_eq(column, value)?;
            }
        }

        if let Some(column) = self.time_column {
            match (param(params, "since"), self.default_window) {
                (Some(raw), _) => {
                    q.since(column, raw)?;
                }
                (None, Some(window)) => {
                    q.since_time(column, Utc::now() - window)?;
                }
                (None, None) => {}
            }
            if let Some(raw) = param(params, "until") {
                q.until(column, raw)?;
            }
        }

        if let Some(j) = &self.json {
            if let Some(raw) = param(params, j.filter_param) {
                q.filter_json(j.column, raw)?;
            }
        }

        if let Some(raw) = param(params, "order_by") {
            q.order_by(raw)?;
        }

        let req = PageRequest::from_query(params, self.per_page_param, &self.spec.limits, q.is_heavy());
        Ok((q, req))
    }

    /// Run the endpoint. An empty page is a 404 with "No <noun> present.".
    pub async fn list(
        &self,
        pool: &PgPool,
        params: &HashMap<String, String>,
        url: &PageUrl,
    ) -> Result<Page<Value>, AppError> {
        let (q, req) = self.build(params)?;
        let page = q.fetch_page(pool, &req, url).await?;
        tracing::debug!(noun = self.noun, count = page.results.len(), "list");
        page.found(self.noun)
    }
}
