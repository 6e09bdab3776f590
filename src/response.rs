//! Paginated response envelope.

use crate::error::AppError;
use crate::pagination::{PageRequest, PageUrl};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

/// Pagination metadata. Absent links are empty strings, not null.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Paging {
    /// Items per page after caps
    #[schema(example = 50)]
    pub per_page: u32,
    #[schema(example = 1626)]
    pub num_pages: u64,
    /// Items matching the query across all pages
    #[schema(example = 81286)]
    pub count: u64,
    #[schema(example = "http://agartha.example.com/api/v1/ex?page=3&per_page=50")]
    pub next: String,
    #[schema(example = "http://agartha.example.com/api/v1/ex?page=1&per_page=50")]
    pub previous: String,
}

impl Paging {
    pub fn new(req: &PageRequest, total: u64, returned: usize, url: &PageUrl) -> Self {
        let next = if req.has_next(returned, total) {
            url.link(req.page + 1, req.per_page)
        } else {
            String::new()
        };
        let previous = if req.has_previous() {
            url.link(req.page - 1, req.per_page)
        } else {
            String::new()
        };
        Paging {
            per_page: req.per_page,
            num_pages: req.num_pages(total),
            count: total,
            next,
            previous,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub paging: Paging,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, total: u64, req: &PageRequest, url: &PageUrl) -> Self {
        Page {
            paging: Paging::new(req, total, results.len(), url),
            results,
        }
    }

    /// Every list endpoint answers an empty page with 404 rather than an empty 200,
    /// whether nothing matched or the page lies past the end.
    pub fn found(self, what: &str) -> Result<Self, AppError> {
        if self.results.is_empty() {
            return Err(AppError::NotFound(format!("No {} present.", what)));
        }
        Ok(self)
    }
}

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageLimits;

    fn url() -> PageUrl {
        PageUrl::new("https", "salt.example.com", &"/api/v1/jid".parse().unwrap(), "per_page")
    }

    fn req(page: u32, per_page: u32) -> PageRequest {
        PageRequest::new(Some(page), Some(per_page), &PageLimits::default(), false)
    }

    #[test]
    fn middle_page_links_both_ways() {
        let page = Page::new(vec![1; 10], 35, &req(2, 10), &url());
        assert_eq!(page.paging.next, "https://salt.example.com/api/v1/jid?page=3&per_page=10");
        assert_eq!(page.paging.previous, "https://salt.example.com/api/v1/jid?page=1&per_page=10");
        assert_eq!(page.paging.num_pages, 4);
        assert_eq!(page.paging.count, 35);
    }

    #[test]
    fn exact_fit_has_no_next() {
        let page = Page::new(vec![0; 10], 10, &req(1, 10), &url());
        assert_eq!(page.paging.next, "");
        assert_eq!(page.paging.previous, "");
        assert_eq!(page.paging.num_pages, 1);
    }

    #[test]
    fn zero_total_is_not_found() {
        let page: Page<u8> = Page::new(Vec::new(), 0, &req(1, 10), &url());
        assert!(matches!(page.found("jids"), Err(AppError::NotFound(m)) if m == "No jids present."));
    }

    #[test]
    fn page_past_end_is_not_found() {
        let page: Page<u8> = Page::new(Vec::new(), 5, &req(3, 10), &url());
        assert!(page.found("jids").is_err());
    }

    #[test]
    fn serialized_shape() {
        let page = Page::new(vec!["a"], 1, &req(1, 50), &url());
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["paging"]["next"], "");
        assert_eq!(json["paging"]["per_page"], 50);
        assert_eq!(json["results"][0], "a");
    }
}
