use crate::web::response::ApiBody;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Business-rule and transport failures surfaced to API callers.
///
/// Every variant maps onto one HTTP status and renders as the standard
/// failure envelope. `Internal` never exposes its source to the caller.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("{0}")]
    CycleClosed(String),

    #[error("nomination already exists for this employee in this cycle")]
    DuplicateNomination,

    #[error("award already exists for this nomination")]
    DuplicateAward,

    #[error("duplicate field key: {0}")]
    DuplicateKey(String),

    #[error("winner must be the nominee of the nomination")]
    WinnerMismatch,

    #[error("{0}")]
    Eligibility(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    #[error("too many attempts, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("internal server error")]
    Internal(#[source] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn forbidden() -> Self {
        AppError::Forbidden("insufficient permissions".to_string())
    }

    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        AppError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::WinnerMismatch => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Eligibility(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::CycleClosed(_) => StatusCode::CONFLICT,
            AppError::DuplicateNomination => StatusCode::CONFLICT,
            AppError::DuplicateAward => StatusCode::CONFLICT,
            AppError::DuplicateKey(_) => StatusCode::CONFLICT,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn headline(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "Validation error",
            AppError::InvalidTransition { .. } => "Invalid status transition",
            AppError::CycleClosed(_) => "Cycle is not open",
            AppError::DuplicateNomination => "Duplicate nomination",
            AppError::DuplicateAward => "Duplicate award",
            AppError::DuplicateKey(_) => "Duplicate field key",
            AppError::WinnerMismatch => "Winner mismatch",
            AppError::Eligibility(_) => "Not eligible",
            AppError::NotFound(_) => "Not found",
            AppError::Forbidden(_) => "Access denied",
            AppError::Unauthorized(_) => "Authentication failed",
            AppError::Conflict(_) => "Conflict",
            AppError::RateLimited { .. } => "Too many requests",
            AppError::Internal(_) => "Request failed",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(source) = &self {
            tracing::error!("Unhandled failure: {:#}", source);
        }
        let status = self.status_code();
        let body: ApiBody<()> = ApiBody::failure(self.headline(), self.to_string());
        (status, Json(body)).into_response()
    }
}

/// Maps storage failures that carry business meaning (unique and check
/// constraints, lock conflicts) onto the taxonomy; everything else is internal.
fn classify_sqlx(err: &sqlx::Error) -> Option<AppError> {
    match err {
        sqlx::Error::RowNotFound => Some(AppError::NotFound("record")),
        sqlx::Error::Database(db) => {
            match db.constraint() {
                Some("uq_nominations_cycle_nominee") => return Some(AppError::DuplicateNomination),
                Some("uq_awards_nomination") => return Some(AppError::DuplicateAward),
                Some("uq_form_fields_form_key") => {
                    return Some(AppError::DuplicateKey("field_key".to_string()))
                }
                Some("users_email_key") => {
                    return Some(AppError::validation("email already registered"))
                }
                Some("users_employee_code_key") => {
                    return Some(AppError::validation("employee code already exists"))
                }
                Some("ck_cycles_dates") => {
                    return Some(AppError::validation("end_date must be after start_date"))
                }
                Some("ck_panel_reviews_score") => {
                    return Some(AppError::validation("score must be between 1 and 5"))
                }
                _ => {}
            }
            // serialization_failure / deadlock_detected
            match db.code().as_deref() {
                Some("40001") | Some("40P01") => Some(AppError::Conflict(
                    "concurrent update detected, retry the request".to_string(),
                )),
                _ => None,
            }
        }
        _ => None,
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        classify_sqlx(&err).unwrap_or_else(|| AppError::Internal(err.into()))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(sqlx_err) = err.downcast_ref::<sqlx::Error>() {
            if let Some(mapped) = classify_sqlx(sqlx_err) {
                return mapped;
            }
        }
        AppError::Internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn business_errors_are_client_errors() {
        let cases = vec![
            AppError::validation("missing required field performance"),
            AppError::invalid_transition("DRAFT", "FINALIZED"),
            AppError::CycleClosed("cycle is CLOSED".into()),
            AppError::DuplicateNomination,
            AppError::DuplicateAward,
            AppError::DuplicateKey("x".into()),
            AppError::WinnerMismatch,
            AppError::Eligibility("nominee is inactive".into()),
            AppError::NotFound("cycle"),
            AppError::forbidden(),
            AppError::Conflict("race".into()),
            AppError::RateLimited { retry_after_secs: 30 },
        ];
        for err in cases {
            assert!(err.status_code().is_client_error(), "{err:?}");
        }
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn failure_envelope_names_the_offending_field() {
        let resp = AppError::validation("missing required field performance").into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "failure");
        assert_eq!(body["message"], "Validation error");
        assert_eq!(body["error"], "missing required field performance");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn internal_errors_hide_their_source() {
        let resp = AppError::from(anyhow::anyhow!("relation \"users\" does not exist")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "internal server error");
        assert!(!body.to_string().contains("relation"));
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn invalid_transition_message_names_both_states() {
        let err = AppError::invalid_transition("SUBMITTED", "FINALIZED");
        assert_eq!(err.to_string(), "cannot move from SUBMITTED to FINALIZED");
    }
}
