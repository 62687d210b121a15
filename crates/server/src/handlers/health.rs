//! Health endpoints.

use crate::auth::require_auth;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::relay_json;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use optipredict_metadata::MetadataStore;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Gateway health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// GET /api/health
///
/// Does not require a token. Fails with 503 when the metadata store is down.
pub async fn health(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.metadata.health_check().await.map_err(|e| {
        tracing::warn!(error = %e, "Metadata health check failed");
        ApiError::Unavailable("Database tidak tersedia".to_string())
    })?;

    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(HealthResponse {
        success: true,
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp,
    }))
}

/// GET /api/ml-health
pub async fn ml_health(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_auth(&req)?;
    let reply = state.ml.health().await?;
    relay_json(reply, "ML service tidak sehat")
}
