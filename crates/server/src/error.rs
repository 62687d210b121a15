//! API error types.

use crate::scratch::ScratchError;
use crate::upstream::UpstreamError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always false.
    pub success: bool,
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("respons ML service tidak valid: {0}")]
    UpstreamData(#[from] optipredict_core::Error),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("scratch storage error: {0}")]
    Scratch(#[from] ScratchError),

    #[error("metadata error: {0}")]
    Metadata(#[from] optipredict_metadata::MetadataError),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Timeout(_) => "timeout",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Unavailable(_) => "ml_service_unavailable",
            Self::Upstream { .. } => "upstream_error",
            Self::UpstreamData(e) => match e {
                optipredict_core::Error::MissingFields(_) => "missing_fields",
                _ => "invalid_upstream_response",
            },
            Self::Internal(_) => "internal_error",
            Self::Scratch(_) => "scratch_error",
            Self::Metadata(_) => "metadata_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { status, .. } => *status,
            Self::UpstreamData(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Scratch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Metadata(e) if e.is_pool_timeout() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Metadata(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(code = self.code(), error = %self, "Request failed");
        }
        let body = ErrorResponse {
            success: false,
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Message returned when the ML service cannot be reached.
pub const ML_UNAVAILABLE: &str = "ML service tidak tersedia";

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Unavailable(_) => Self::Unavailable(ML_UNAVAILABLE.to_string()),
            UpstreamError::Timeout(_) => {
                Self::Timeout("Request timeout ke ML service".to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
