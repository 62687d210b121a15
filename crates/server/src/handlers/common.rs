//! Shared handler helpers.

use crate::error::{ApiError, ApiResult};
use crate::upstream::UpstreamReply;
use axum::Json;
use axum::http::StatusCode;
use serde_json::Value;

/// Relay a JSON reply from the ML service.
///
/// 2xx bodies are sanitized and passed through with the upstream status.
/// Anything else becomes an error carrying the upstream status and its
/// `message`, or `fallback` when it has none.
pub fn relay_json(reply: UpstreamReply, fallback: &str) -> ApiResult<(StatusCode, Json<Value>)> {
    if !reply.status.is_success() {
        tracing::warn!(status = %reply.status, "ML service returned an error");
        let message = reply.message().unwrap_or_else(|| fallback.to_string());
        return Err(ApiError::Upstream {
            status: reply.status,
            message,
        });
    }
    let value = optipredict_core::sanitize(&reply.body)?;
    Ok((reply.status, Json(value)))
}
