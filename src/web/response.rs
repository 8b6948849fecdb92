use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// `{status, message, error, data}` body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiBody<T> {
    pub status: &'static str,
    pub message: String,
    pub error: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiBody<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            message: message.into(),
            error: None,
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: "failure",
            message: message.into(),
            error: Some(error.into()),
            data: None,
        }
    }
}

pub struct ApiResponse<T> {
    code: StatusCode,
    body: ApiBody<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: StatusCode::OK,
            body: ApiBody::success(message, data),
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            code: StatusCode::CREATED,
            body: ApiBody::success(message, data),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.code, Json(self.body)).into_response()
    }
}
