use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use store::StoreError;
use thiserror::Error;
use tracing::{error, warn};

use crate::schemas::{ActionResponse, ErrorResponse};

/// Errors a request handler can end with.
///
/// Each variant maps to one response shape: JSON for client mistakes on action
/// endpoints, plain text for missing pages and denied access, a redirect when no
/// one is signed in, and an opaque 500 for storage failures.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    fn action_failure(status: StatusCode, message: String) -> Response {
        let body = ActionResponse {
            success: false,
            message: Some(message),
        };
        (status, Json(body)).into_response()
    }

    fn internal(detail: &str) -> Response {
        error!("Request failed: {}", detail);
        let body = ErrorResponse {
            error: "Internal server error".to_string(),
            code: "INTERNAL_ERROR".to_string(),
            success: false,
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(message) => Self::action_failure(StatusCode::BAD_REQUEST, message),
            AppError::Conflict(message) => Self::action_failure(StatusCode::CONFLICT, message),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message).into_response(),
            AppError::Forbidden(message) => {
                warn!("Access denied: {}", message);
                (StatusCode::FORBIDDEN, message).into_response()
            }
            AppError::Unauthenticated => Redirect::to("/login").into_response(),
            AppError::Store(StoreError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, format!("Not found: {}", what)).into_response()
            }
            AppError::Store(StoreError::Conflict(message)) => {
                Self::action_failure(StatusCode::CONFLICT, message)
            }
            AppError::Store(StoreError::Duplicate(what)) => {
                Self::action_failure(StatusCode::BAD_REQUEST, format!("Duplicate {}", what))
            }
            AppError::Store(StoreError::Database(db_error)) => Self::internal(&db_error.to_string()),
            AppError::Internal(detail) => Self::internal(&detail),
        }
    }
}
