use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use judge::{JudgeError, StoreError};
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `INVALID_ARGUMENT`, `TOKEN_INVALID`,
    /// `PERMISSION_DENIED`, `NOT_FOUND`, `CONFLICT`, `UNAVAILABLE`, `INTERNAL_ERROR`.
    #[schema(example = "INVALID_ARGUMENT")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Unknown order 'dummy'")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    InvalidArgument(String),
    TokenInvalid,
    PermissionDenied(String),
    NotFound(String),
    Conflict(String),
    /// The store is temporarily unreachable; the client may retry.
    Unavailable(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::InvalidArgument(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "INVALID_ARGUMENT",
                    message: msg,
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::PermissionDenied(msg) => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::Unavailable(detail) => {
                tracing::warn!("Store unavailable: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorBody {
                        code: "UNAVAILABLE",
                        message: "Service temporarily unavailable".into(),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<JudgeError> for AppError {
    fn from(err: JudgeError) -> Self {
        match err {
            JudgeError::InvalidArgument(msg) => AppError::InvalidArgument(msg),
            JudgeError::NotFound(msg) => AppError::NotFound(msg),
            JudgeError::PermissionDenied(msg) => AppError::PermissionDenied(msg),
            JudgeError::Conflict(msg) => AppError::Conflict(msg),
            lost @ JudgeError::LeaseLost { .. } => AppError::Conflict(lost.to_string()),
            JudgeError::Unavailable(detail) => AppError::Unavailable(detail),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        JudgeError::from(err).into()
    }
}
