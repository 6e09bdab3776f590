//! Page/per-page parameters, offset arithmetic and next/previous links.

use crate::config::PageLimits;
use axum::http::{header, HeaderMap, Uri};
use std::collections::HashMap;

/// Effective page request after defaults and caps. `page` and `per_page` are always >= 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// `heavy` is set when large detail columns are part of the selection; it lowers the cap.
    pub fn new(page: Option<u32>, per_page: Option<u32>, limits: &PageLimits, heavy: bool) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let mut cap = limits.max_per_page.max(1);
        if heavy {
            cap = cap.min(limits.heavy_per_page.max(1));
        }
        let per_page = per_page
            .filter(|n| *n >= 1)
            .unwrap_or(limits.default_per_page)
            .clamp(1, cap);
        PageRequest { page, per_page }
    }

    /// Read `page` and `per_page_param` (`per_page` or `limit`) from query parameters.
    /// Unparseable values fall back to the defaults.
    pub fn from_query(
        params: &HashMap<String, String>,
        per_page_param: &str,
        limits: &PageLimits,
        heavy: bool,
    ) -> Self {
        let read = |name: &str| {
            let raw = params.get(name)?;
            match raw.trim().parse::<u32>() {
                Ok(n) => Some(n),
                Err(_) => {
                    tracing::debug!(param = name, value = %raw, "invalid pagination value, using default");
                    None
                }
            }
        };
        let req = PageRequest::new(read("page"), read(per_page_param), limits, heavy);
        if heavy && read(per_page_param).is_some_and(|n| n > req.per_page) {
            tracing::debug!(per_page = req.per_page, "per_page capped for detailed data");
        }
        req
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Whether rows remain after this page, given how many were returned.
    pub fn has_next(&self, returned: usize, total: u64) -> bool {
        self.offset() + (returned as u64) < total
    }

    pub fn num_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.per_page))
    }
}

/// The request URL, used to derive next/previous links by substituting `page`.
#[derive(Clone, Debug)]
pub struct PageUrl {
    base: String,
    query: Vec<(String, String)>,
    per_page_param: String,
}

impl PageUrl {
    pub fn new(scheme: &str, host: &str, uri: &Uri, per_page_param: &str) -> Self {
        let query = uri
            .query()
            .unwrap_or("")
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect();
        PageUrl {
            base: format!("{}://{}{}", scheme, host, uri.path()),
            query,
            per_page_param: per_page_param.to_string(),
        }
    }

    /// Scheme from `X-Forwarded-Proto` (default `http`), host from `Host`.
    pub fn from_request(headers: &HeaderMap, uri: &Uri, per_page_param: &str) -> Self {
        let header_str = |name| headers.get(name).and_then(|v| v.to_str().ok());
        let scheme = header_str(header::HeaderName::from_static("x-forwarded-proto"))
            .or_else(|| uri.scheme_str())
            .unwrap_or("http");
        let host = header_str(header::HOST)
            .or_else(|| uri.authority().map(|a| a.as_str()))
            .unwrap_or("localhost");
        PageUrl::new(scheme, host, uri, per_page_param)
    }

    /// Same URL with `page` and the page-size parameter replaced; other parameters keep their order.
    pub fn link(&self, page: u32, per_page: u32) -> String {
        let mut pairs: Vec<(String, String)> = Vec::with_capacity(self.query.len() + 2);
        let mut seen_page = false;
        let mut seen_per_page = false;
        for (k, v) in &self.query {
            if k == "page" {
                if !seen_page {
                    pairs.push((k.clone(), page.to_string()));
                    seen_page = true;
                }
            } else if *k == self.per_page_param {
                if !seen_per_page {
                    pairs.push((k.clone(), per_page.to_string()));
                    seen_per_page = true;
                }
            } else {
                pairs.push((k.clone(), v.clone()));
            }
        }
        if !seen_page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        if !seen_per_page {
            pairs.push((self.per_page_param.clone(), per_page.to_string()));
        }
        let query = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.base, query)
    }
}
