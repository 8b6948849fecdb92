//! Extractors whose rejections render as the failure envelope.

use crate::error::AppError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Keeps serde's description of the problem and drops axum's prefix.
fn detail(body_text: &str, fallback: &str) -> String {
    body_text
        .split_once(": ")
        .map(|(_, detail)| detail.to_string())
        .unwrap_or_else(|| fallback.to_string())
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => {
                AppError::validation(detail(&e.body_text(), "request body has the wrong shape"))
            }
            JsonRejection::JsonSyntaxError(_) => AppError::validation("request body is not valid JSON"),
            JsonRejection::MissingJsonContentType(_) => {
                AppError::validation("expected a request body with Content-Type: application/json")
            }
            _ => AppError::validation("request body could not be read"),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Path rejected: {}", rejection.body_text());
        AppError::validation("invalid path parameter")
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::validation(detail(&rejection.body_text(), "invalid query parameters"))
    }
}
