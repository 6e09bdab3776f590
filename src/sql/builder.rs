//! Builds the parameterized page and count statements for one list endpoint.

use super::filter::build_json_path_where;
use super::order::validate_order_by;
use super::params::SqlParam;
use super::quote::quoted;
use super::select::build_json_path_select;
use super::split::split_list;
use super::wildcard::translate_wildcards;
use crate::config::PageLimits;
use crate::error::{AppError, QueryError};
use crate::pagination::{PageRequest, PageUrl};
use crate::response::Page;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

/// Static description of a list endpoint. Every identifier that reaches SQL comes from here.
#[derive(Clone, Debug)]
pub struct ListSpec {
    pub schema: Option<&'static str>,
    pub table: &'static str,
    /// Always selected; also the columns text filters may target.
    pub columns: &'static [&'static str],
    /// Large detail columns, selected on request. Selecting one lowers the page-size cap.
    pub heavy_columns: &'static [&'static str],
    /// JSONB columns that accept subpath projection and containment filters.
    pub json_columns: &'static [&'static str],
    /// Whitelist for ORDER BY.
    pub sortable: &'static [&'static str],
    /// Used when the client sends no ordering. May be empty.
    pub default_order: &'static str,
    pub limits: PageLimits,
}

impl ListSpec {
    fn qualified_table(&self) -> String {
        match self.schema {
            Some(schema) => format!("{}.{}", quoted(schema), quoted(self.table)),
            None => quoted(self.table),
        }
    }

    fn lookup(set: &'static [&'static str], column: &str) -> Result<&'static str, QueryError> {
        set.iter().copied().find(|c| *c == column).ok_or_else(|| QueryError::InvalidColumn {
            column: column.to_string(),
            valid: set.iter().map(|c| c.to_string()).collect(),
        })
    }
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// Accumulates selection, predicates and ordering for a [`ListSpec`].
#[derive(Debug)]
pub struct ListQuery<'a> {
    spec: &'a ListSpec,
    select: Vec<String>,
    where_parts: Vec<String>,
    params: Vec<SqlParam>,
    order: Option<String>,
    projected: Option<&'static str>,
    json_paths: Vec<String>,
    heavy: bool,
}

impl<'a> ListQuery<'a> {
    pub fn new(spec: &'a ListSpec) -> Self {
        ListQuery {
            spec,
            select: spec.columns.iter().map(|c| quoted(c)).collect(),
            where_parts: Vec::new(),
            params: Vec::new(),
            order: None,
            projected: None,
            json_paths: Vec::new(),
            heavy: false,
        }
    }

    fn push_param(&mut self, v: SqlParam) -> String {
        let n = self.params.len() + 1;
        let ph = v.placeholder(n);
        self.params.push(v);
        ph
    }

    /// True once a heavy or JSON column is selected whole.
    pub fn is_heavy(&self) -> bool {
        self.heavy
    }

    /// Select a heavy or JSON column whole.
    pub fn include_column(&mut self, column: &str) -> Result<&mut Self, QueryError> {
        let col = ListSpec::lookup(self.spec.heavy_columns, column)
            .or_else(|_| ListSpec::lookup(self.spec.json_columns, column))
            .map_err(|_| QueryError::InvalidColumn {
                column: column.to_string(),
                valid: self
                    .spec
                    .heavy_columns
                    .iter()
                    .chain(self.spec.json_columns)
                    .map(|c| c.to_string())
                    .collect(),
            })?;
        let q = quoted(col);
        if !self.select.contains(&q) {
            self.select.push(q);
        }
        self.heavy = true;
        Ok(self)
    }

    /// Select only the listed subpaths of a JSON column, as an object keyed by leaf. Replaces a
    /// whole-column selection of the same column and does not count as heavy.
    /// `raw` is the comma-separated path list; blank input selects nothing extra.
    pub fn project_json_paths(&mut self, column: &str, raw: &str) -> Result<&mut Self, QueryError> {
        let col = ListSpec::lookup(self.spec.json_columns, column)?;
        let paths = split_list(raw)?;
        if paths.is_empty() {
            return Ok(self);
        }
        let fragment = build_json_path_select(&paths, &quoted(col))?;
        tracing::debug!(column = col, fragment = %fragment, "json path select");
        let whole = quoted(col);
        self.select.retain(|s| *s != whole);
        self.select.push(fragment);
        self.projected = Some(col);
        self.json_paths.extend(paths.into_iter().map(str::to_string));
        Ok(self)
    }

    /// `col = $n`, or `col LIKE $n` when `value` contains `*` or `?`.
    pub fn filter_text(&mut self, column: &str, value: &str) -> Result<&mut Self, QueryError> {
        let col = ListSpec::lookup(self.spec.columns, column)?;
        let m = translate_wildcards(value);
        let op = m.operator();
        let ph = self.push_param(SqlParam::Text(m.into_value()));
        self.where_parts.push(format!("{} {} {}", quoted(col), op, ph));
        Ok(self)
    }

    pub fn filter_eq(&mut self, column: &str, value: impl Into<SqlParam>) -> Result<&mut Self, QueryError> {
        let col = ListSpec::lookup(self.spec.columns, column)?;
        let ph = self.push_param(value.into());
        self.where_parts.push(format!("{} = {}", quoted(col), ph));
        Ok(self)
    }

    /// `col >= $n::timestamptz` from an RFC 3339 `since` parameter.
    pub fn since(&mut self, column: &str, raw: &str) -> Result<&mut Self, QueryError> {
        self.time_bound(column, "since", ">=", raw)
    }

    /// `col <= $n::timestamptz` from an RFC 3339 `until` parameter.
    pub fn until(&mut self, column: &str, raw: &str) -> Result<&mut Self, QueryError> {
        self.time_bound(column, "until", "<=", raw)
    }

    /// `col >= $n::timestamptz` from an already known instant, e.g. a default look-back window.
    pub fn since_time(&mut self, column: &str, t: DateTime<Utc>) -> Result<&mut Self, QueryError> {
        self.bound(column, ">=", t)
    }

    fn time_bound(
        &mut self,
        column: &str,
        param: &'static str,
        op: &str,
        raw: &str,
    ) -> Result<&mut Self, QueryError> {
        let t = DateTime::parse_from_rfc3339(raw.trim())
            .map_err(|_| QueryError::InvalidTimestamp {
                param,
                value: raw.to_string(),
            })?
            .with_timezone(&Utc);
        self.bound(column, op, t)
    }

    fn bound(&mut self, column: &str, op: &str, t: DateTime<Utc>) -> Result<&mut Self, QueryError> {
        let col = ListSpec::lookup(self.spec.columns, column)?;
        let ph = self.push_param(SqlParam::Timestamp(t));
        self.where_parts.push(format!("{} {} {}", quoted(col), op, ph));
        Ok(self)
    }

    /// JSONB containment from a comma-separated list of `path:value::type` tokens.
    pub fn filter_json(&mut self, column: &str, raw: &str) -> Result<&mut Self, QueryError> {
        let col = ListSpec::lookup(self.spec.json_columns, column)?;
        let tokens = split_list(raw)?;
        if tokens.is_empty() {
            return Ok(self);
        }
        let clause = build_json_path_where(&tokens, &quoted(col))?;
        tracing::debug!(column = col, clause = %clause, "json path where");
        self.where_parts.push(clause);
        Ok(self)
    }

    /// Validated ORDER BY. Leaf keys of projected JSON paths are sortable alongside the whitelist.
    /// Blank input keeps the default ordering.
    pub fn order_by(&mut self, raw: &str) -> Result<&mut Self, QueryError> {
        let json_column = self
            .projected
            .or_else(|| self.spec.json_columns.first().copied())
            .map(quoted)
            .unwrap_or_default();
        let order = validate_order_by(raw, self.spec.sortable, &json_column, &self.json_paths)?;
        if !order.is_empty() {
            self.order = Some(order);
        }
        Ok(self)
    }

    fn inner_select(&self) -> String {
        let where_clause = if self.where_parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_parts.join(" AND "))
        };
        format!(
            "SELECT {} FROM {}{}",
            self.select.join(", "),
            self.spec.qualified_table(),
            where_clause
        )
    }

    /// Row count of the filtered, unpaginated selection.
    pub fn count_statement(&self) -> QueryBuf {
        QueryBuf {
            sql: format!("SELECT COUNT(*) FROM ({}) page", self.inner_select()),
            params: self.params.clone(),
        }
    }

    /// One JSON object per row. Ordering applies to the projected row so JSON leaf keys resolve
    /// against the object built by the selection.
    pub fn page_statement(&self, req: &PageRequest) -> QueryBuf {
        let order = self.order.as_deref().unwrap_or(self.spec.default_order);
        let order_clause = if order.is_empty() {
            String::new()
        } else {
            format!(" ORDER BY {}", order)
        };
        QueryBuf {
            sql: format!(
                "SELECT row_to_json(page) FROM ({}) page{} LIMIT {} OFFSET {}",
                self.inner_select(),
                order_clause,
                req.per_page,
                req.offset()
            ),
            params: self.params.clone(),
        }
    }

    pub async fn fetch_page(
        &self,
        pool: &PgPool,
        req: &PageRequest,
        url: &PageUrl,
    ) -> Result<Page<Value>, AppError> {
        let count = self.count_statement();
        tracing::debug!(sql = %count.sql, params = ?count.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&count.sql);
        for p in &count.params {
            query = query.bind(p.clone());
        }
        let total = query.fetch_one(pool).await?;

        let page = self.page_statement(req);
        tracing::debug!(sql = %page.sql, params = ?page.params, "query");
        let mut query = sqlx::query_scalar::<_, Value>(&page.sql);
        for p in &page.params {
            query = query.bind(p.clone());
        }
        let rows = query.fetch_all(pool).await?;
        Ok(Page::new(rows, u64::try_from(total).unwrap_or(0), req, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT_CACHE: ListSpec = ListSpec {
        schema: None,
        table: "salt_cache",
        columns: &["bank", "etag", "alter_time"],
        heavy_columns: &[],
        json_columns: &["data"],
        sortable: &["bank", "etag", "alter_time"],
        default_order: "alter_time desc",
        limits: PageLimits::new(50, 1000, 10),
    };

    fn req(page: u32, per_page: u32, heavy: bool) -> PageRequest {
        PageRequest::new(Some(page), Some(per_page), &SALT_CACHE.limits, heavy)
    }

    #[test]
    fn bare_listing() {
        let q = ListQuery::new(&SALT_CACHE);
        assert_eq!(
            q.page_statement(&req(1, 50, false)).sql,
            "SELECT row_to_json(page) FROM (SELECT \"bank\", \"etag\", \"alter_time\" FROM \"salt_cache\") page ORDER BY alter_time desc LIMIT 50 OFFSET 0"
        );
        assert_eq!(
            q.count_statement().sql,
            "SELECT COUNT(*) FROM (SELECT \"bank\", \"etag\", \"alter_time\" FROM \"salt_cache\") page"
        );
        assert!(!q.is_heavy());
    }

    #[test]
    fn text_filters_bind_values() {
        let mut q = ListQuery::new(&SALT_CACHE);
        q.filter_text("bank", "minions/web*").unwrap();
        q.filter_text("etag", "abc").unwrap();
        let count = q.count_statement();
        assert!(count.sql.ends_with("WHERE \"bank\" LIKE $1 AND \"etag\" = $2) page"));
        assert_eq!(
            count.params,
            vec![SqlParam::Text("minions/web%".into()), SqlParam::Text("abc".into())]
        );
    }

    #[test]
    fn unknown_filter_column_is_rejected() {
        let mut q = ListQuery::new(&SALT_CACHE);
        let err = q.filter_text("bank; drop table x", "a").unwrap_err();
        assert!(matches!(err, QueryError::InvalidColumn { .. }));
    }

    #[test]
    fn time_range() {
        let mut q = ListQuery::new(&SALT_CACHE);
        q.since("alter_time", "2024-01-01T00:00:00Z").unwrap();
        q.until("alter_time", "2024-02-01T00:00:00+01:00").unwrap();
        let sql = q.count_statement().sql;
        assert!(sql.contains("\"alter_time\" >= $1::timestamptz AND \"alter_time\" <= $2::timestamptz"));
        assert_eq!(
            q.count_statement().params[1].to_text(),
            "2024-01-31T23:00:00+00:00"
        );

        let err = ListQuery::new(&SALT_CACHE).since("alter_time", "yesterday").unwrap_err();
        assert!(matches!(err, QueryError::InvalidTimestamp { param: "since", .. }));
    }

    #[test]
    fn projection_filter_and_leaf_ordering() {
        let mut q = ListQuery::new(&SALT_CACHE);
        q.project_json_paths("data", "grains.os, grains.osrelease").unwrap();
        q.filter_json("data", "grains.os:Ubuntu::string").unwrap();
        q.order_by("os desc, bank").unwrap();
        assert!(!q.is_heavy());
        assert_eq!(
            q.page_statement(&req(2, 500, q.is_heavy())).sql,
            "SELECT row_to_json(page) FROM (SELECT \"bank\", \"etag\", \"alter_time\", \
             jsonb_build_object('os', jsonb_path_query(\"data\", '$.grains.os'), \
             'osrelease', jsonb_path_query(\"data\", '$.grains.osrelease')) AS \"data\" \
             FROM \"salt_cache\" WHERE \"data\" @> '{\"grains\":{\"os\":\"Ubuntu\"}}'::jsonb) page \
             ORDER BY jsonb_extract_path_text(\"data\", 'os') desc, bank asc LIMIT 500 OFFSET 500"
        );
    }

    #[test]
    fn include_whole_json_column() {
        let mut q = ListQuery::new(&SALT_CACHE);
        q.include_column("data").unwrap();
        q.include_column("data").unwrap();
        assert!(q.is_heavy());
        assert!(q.count_statement().sql.starts_with("SELECT COUNT(*) FROM (SELECT \"bank\", \"etag\", \"alter_time\", \"data\" FROM"));
        assert!(q.include_column("etag").is_err());
    }

    #[test]
    fn order_outside_whitelist_is_rejected() {
        let mut q = ListQuery::new(&SALT_CACHE);
        let err = q.order_by("height").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid column name 'height'. Valid columns: [bank etag alter_time]"
        );
    }

    #[test]
    fn blank_parameters_are_no_ops() {
        let mut q = ListQuery::new(&SALT_CACHE);
        q.project_json_paths("data", " ").unwrap();
        q.filter_json("data", "").unwrap();
        q.order_by("").unwrap();
        assert!(!q.is_heavy());
        assert!(q.page_statement(&req(1, 5, false)).sql.contains("ORDER BY alter_time desc LIMIT 5"));
    }

    #[test]
    fn schema_qualified_table() {
        let spec = ListSpec { schema: Some("salt"), ..SALT_CACHE };
        assert!(ListQuery::new(&spec).count_statement().sql.contains("FROM \"salt\".\"salt_cache\""));
    }
}
