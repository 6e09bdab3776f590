//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors raised while turning query-string text into SQL fragments.
/// Every variant stems from caller input; none of them is retryable.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("empty json path")]
    EmptyPath,
    #[error("unterminated quote in '{input}'")]
    UnterminatedQuote { input: String },
    #[error("invalid json path '{input}': {reason}")]
    InvalidPath { input: String, reason: &'static str },
    #[error("malformed token '{token}': {reason}")]
    MalformedToken { token: String, reason: &'static str },
    #[error("error parsing value '{value}' as {type_name} in '{token}'")]
    InvalidValueForType {
        token: String,
        value: String,
        type_name: &'static str,
    },
    #[error("conflicting filter path '{path}' in '{token}': a value and an object share the same key")]
    ConflictingFilterPath { token: String, path: String },
    #[error("invalid column name '{column}'. Valid columns: [{}]", .valid.join(" "))]
    InvalidColumn { column: String, valid: Vec<String> },
    #[error("invalid sort direction '{direction}', must be 'asc' or 'desc'")]
    InvalidSortDirection { direction: String },
    #[error("invalid '{param}' date format: '{value}' is not RFC 3339")]
    InvalidTimestamp { param: &'static str, value: String },
    #[error("encode filter document: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Query(QueryError::Encode(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
            AppError::Query(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        }
    }

    /// Column errors echo the whitelist so clients can correct their `order_by`.
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Query(QueryError::InvalidColumn { column, valid }) => Some(serde_json::json!({
                "column": column,
                "valid_columns": valid,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        (status, Json(body)).into_response()
    }
}
