//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use continuity_core::{EngineError, ValidationError, Violation};
use serde::Serialize;
use thiserror::Error;

/// Anything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),
}

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<Violation>>,
}

impl ApiError {
    /// A request part that could not be read.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ApiError::Engine(EngineError::Validation(ValidationError::Invalid {
            field,
            reason: reason.into(),
        }))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(err) => match err {
                EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::ContinuityViolation { .. } => StatusCode::CONFLICT,
                EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
                EngineError::ConflictRetryable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                EngineError::Store(_) | EngineError::Encoding(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Engine(err) => match err {
                EngineError::Validation(_) => "validation_error",
                EngineError::ContinuityViolation { .. } => "continuity_violation",
                EngineError::NotFound { .. } => "not_found",
                EngineError::ConflictRetryable { .. } => "conflict_retryable",
                EngineError::Store(_) | EngineError::Encoding(_) => "store_error",
            },
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
        }
    }

    pub fn body(&self) -> ErrorBody {
        let violations = match self {
            ApiError::Engine(EngineError::ContinuityViolation { violations }) => {
                Some(violations.clone())
            }
            _ => None,
        };
        ErrorBody {
            error: self.kind(),
            message: self.to_string(),
            violations,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
