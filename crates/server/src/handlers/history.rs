//! Prediction history and upload audit endpoints.

use crate::auth::require_auth;
use crate::error::ApiResult;
use crate::handlers::common::relay_json;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use optipredict_metadata::UploadAuditRow;
use optipredict_metadata::repos::UploadAuditRepo;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_UPLOAD_LIMIT: u32 = 50;
const MAX_UPLOAD_LIMIT: u32 = 500;

/// GET /api/predictions
pub async fn predictions(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = require_auth(&req)?;
    let reply = state.ml.predictions(user.user_id).await?;
    relay_json(reply, "Gagal mengambil riwayat prediksi")
}

/// GET /api/predictions/count
pub async fn prediction_count(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = require_auth(&req)?;
    let reply = state.ml.prediction_count(user.user_id).await?;
    relay_json(reply, "Gagal menghitung prediksi")
}

/// DELETE /api/predictions/all
pub async fn delete_predictions(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = require_auth(&req)?;
    tracing::info!(user_id = user.user_id, "Deleting prediction history");
    let reply = state.ml.delete_predictions(user.user_id).await?;
    relay_json(reply, "Gagal menghapus riwayat prediksi")
}

/// Query parameters for the upload history.
#[derive(Debug, Default, Deserialize)]
pub struct UploadsQuery {
    pub limit: Option<u32>,
}

impl UploadsQuery {
    fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_UPLOAD_LIMIT)
            .clamp(1, MAX_UPLOAD_LIMIT)
    }
}

/// Upload history response.
#[derive(Debug, Serialize)]
pub struct UploadsResponse {
    pub success: bool,
    pub uploads: Vec<UploadAuditRow>,
    /// All audit rows for the caller, not only those returned.
    pub total: u64,
}

/// GET /api/uploads?limit=N
pub async fn list_uploads(
    State(state): State<AppState>,
    Query(query): Query<UploadsQuery>,
    req: Request,
) -> ApiResult<Json<UploadsResponse>> {
    let user = require_auth(&req)?;
    let uploads = state
        .metadata
        .list_uploads(user.user_id, query.effective_limit())
        .await?;
    let total = state.metadata.count_uploads(user.user_id).await?;

    Ok(Json(UploadsResponse {
        success: true,
        uploads,
        total,
    }))
}
