//! Prediction endpoints: batch file upload and manual single-row input.

use crate::audit::spawn_audit;
use crate::auth::{get_trace_id, require_auth};
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::relay_json;
use crate::metrics::{self, ROWS_TRUNCATED, UPLOAD_BYTES, UPSTREAM_RELAY_DURATION};
use crate::scratch::{ScratchError, ScratchFile, ScratchStore};
use crate::state::AppState;
use crate::timeout::relay_timeout_message;
use crate::upstream::UpstreamError;
use axum::Json;
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::StatusCode;
use futures::StreamExt;
use optipredict_core::{BYTES_PER_MB, BatchPredictionResponse, UpstreamPrediction, sanitize};
use optipredict_metadata::NewUploadAudit;
use serde_json::Value;
use std::path::Path;
use std::time::Instant;

/// Accepted spreadsheet extensions, compared case-insensitively.
const ALLOWED_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

const NO_FILE: &str = "Tidak ada file yang diunggah";
const EMPTY_FILE: &str = "File kosong atau tidak valid";
const UNSUPPORTED_FILE: &str =
    "Format file tidak didukung. Gunakan file CSV atau Excel (.csv, .xlsx, .xls)";
const MULTIPLE_FILES: &str = "Hanya satu file yang dapat diunggah per permintaan";
const UPSTREAM_FAILED: &str = "ML service gagal memproses file";
const INVALID_JSON: &str = "Invalid JSON format";

/// POST /api/predict-file
#[tracing::instrument(skip_all, fields(user_id, filename, size))]
pub async fn predict_file(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<BatchPredictionResponse>> {
    let result = handle_batch_predict(&state, req).await;
    metrics::record_batch_outcome(batch_outcome(&result));
    result.map(Json)
}

async fn handle_batch_predict(state: &AppState, req: Request) -> ApiResult<BatchPredictionResponse> {
    let trace_id = get_trace_id(&req).cloned().unwrap_or_default();
    let user = require_auth(&req)?.clone();
    let span = tracing::Span::current();
    span.record("user_id", user.user_id);

    let mut multipart = Multipart::from_request(req, state)
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let upload = receive_upload(&state.scratch, &mut multipart, state.config.server.max_upload_bytes)
        .await?;
    span.record("filename", upload.original_name());
    span.record("size", upload.size());

    if upload.size() > state.ml.max_relay_bytes() {
        return Err(ApiError::PayloadTooLarge(format!(
            "File melebihi batas relay {} MB",
            state.ml.max_relay_bytes() / BYTES_PER_MB
        )));
    }
    UPLOAD_BYTES.inc_by(upload.size());

    let relay_timeout = state.timeouts.for_upload(upload.size());
    tracing::info!(
        trace_id = %trace_id,
        timeout_secs = relay_timeout.as_secs(),
        "Relaying upload to ML service"
    );

    let started = Instant::now();
    let relayed = state
        .ml
        .predict_file(&upload, user.user_id, relay_timeout)
        .await;
    UPSTREAM_RELAY_DURATION.observe(started.elapsed().as_secs_f64());

    let reply = relayed.map_err(|e| match e {
        UpstreamError::Timeout(limit) => {
            ApiError::Timeout(relay_timeout_message(upload.size(), limit))
        }
        other => {
            tracing::warn!(error = %other, "Batch relay failed");
            ApiError::from(other)
        }
    })?;

    if reply.status.is_client_error() || reply.status.is_server_error() {
        tracing::warn!(status = %reply.status, "ML service rejected batch upload");
        return Err(ApiError::Upstream {
            status: reply.status,
            message: UPSTREAM_FAILED.to_string(),
        });
    }

    let value = sanitize(&reply.body)?;
    let prediction = UpstreamPrediction::from_value(value)?;
    let response = BatchPredictionResponse::from_upstream(prediction, user.user_id);

    if response.is_limited {
        ROWS_TRUNCATED.inc_by(response.total_rows.saturating_sub(response.displayed_rows));
        tracing::info!(
            total_rows = response.total_rows,
            displayed_rows = response.displayed_rows,
            "Batch results truncated"
        );
    }

    if response.success {
        spawn_audit(
            state.metadata.clone(),
            NewUploadAudit::completed(
                user.user_id,
                upload.original_name(),
                upload.size(),
                response.total_rows,
                response.valid_rows,
                response.processed_rows,
            ),
        );
    }

    tracing::info!(
        total_rows = response.total_rows,
        processed_rows = response.processed_rows,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Batch prediction completed"
    );
    Ok(response)
}

/// Read the multipart body and persist the single `file` field.
async fn receive_upload(
    scratch: &ScratchStore,
    multipart: &mut Multipart,
    max_upload_bytes: u64,
) -> ApiResult<ScratchFile> {
    let mut upload: Option<ScratchFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_upload_bytes))?
    {
        if field.name() != Some("file") {
            continue;
        }
        if upload.is_some() {
            return Err(ApiError::BadRequest(MULTIPLE_FILES.to_string()));
        }

        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest(NO_FILE.to_string()))?;
        if !has_allowed_extension(&filename) {
            return Err(ApiError::BadRequest(UNSUPPORTED_FILE.to_string()));
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let mut limit_hit = false;
        let body = field.map(|chunk| {
            chunk.inspect_err(|e| limit_hit |= e.status() == StatusCode::PAYLOAD_TOO_LARGE)
        });
        let persisted = scratch.persist(&filename, &content_type, body).await;
        let file = persisted.map_err(|e| match e {
            _ if limit_hit => too_large(max_upload_bytes),
            ScratchError::Stream(msg) => ApiError::BadRequest(format!("Gagal membaca file: {msg}")),
            other => ApiError::Scratch(other),
        })?;
        upload = Some(file);
    }

    let upload = upload.ok_or_else(|| ApiError::BadRequest(NO_FILE.to_string()))?;
    if upload.is_empty() {
        return Err(ApiError::BadRequest(EMPTY_FILE.to_string()));
    }
    Ok(upload)
}

fn has_allowed_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

fn multipart_error(err: MultipartError, max_upload_bytes: u64) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_upload_bytes)
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

fn too_large(max_upload_bytes: u64) -> ApiError {
    ApiError::PayloadTooLarge(format!(
        "Ukuran file melebihi batas {} MB",
        max_upload_bytes / BYTES_PER_MB
    ))
}

fn batch_outcome(result: &ApiResult<BatchPredictionResponse>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(ApiError::BadRequest(_) | ApiError::PayloadTooLarge(_)) => "rejected",
        Err(ApiError::Unauthorized(_) | ApiError::Forbidden(_)) => "unauthorized",
        Err(ApiError::Timeout(_)) => "timeout",
        Err(ApiError::Unavailable(_)) => "unavailable",
        Err(ApiError::Upstream { .. }) => "upstream_error",
        Err(ApiError::UpstreamData(_)) => "invalid_response",
        Err(_) => "error",
    }
}

/// POST /api/predict
///
/// Forwards a manual prediction. `userId` is filled in from the token when
/// the client leaves it out.
#[tracing::instrument(skip_all)]
pub async fn predict(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = require_auth(&req)?.clone();

    let max_upload_bytes = state.config.server.max_upload_bytes;
    let bytes = Bytes::from_request(req, &state).await.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            too_large(max_upload_bytes)
        } else {
            ApiError::BadRequest(INVALID_JSON.to_string())
        }
    })?;
    let mut payload: Value = serde_json::from_slice(&bytes)
        .map_err(|_| ApiError::BadRequest(INVALID_JSON.to_string()))?;

    let Value::Object(fields) = &mut payload else {
        return Err(ApiError::BadRequest(INVALID_JSON.to_string()));
    };
    if fields.get("userId").is_none_or(Value::is_null) {
        fields.insert("userId".to_string(), Value::from(user.user_id));
    }

    let reply = state.ml.predict(&payload).await?;
    relay_json(reply, "Prediction failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_check_is_case_insensitive() {
        assert!(has_allowed_extension("data.csv"));
        assert!(has_allowed_extension("DATA.XLSX"));
        assert!(has_allowed_extension("legacy.Xls"));
        assert!(!has_allowed_extension("notes.txt"));
        assert!(!has_allowed_extension("csv"));
        assert!(!has_allowed_extension("archive.csv.zip"));
    }

    #[test]
    fn test_batch_outcome_labels() {
        assert_eq!(
            batch_outcome(&Err(ApiError::BadRequest(EMPTY_FILE.to_string()))),
            "rejected"
        );
        assert_eq!(
            batch_outcome(&Err(ApiError::Unavailable("x".to_string()))),
            "unavailable"
        );
        assert_eq!(
            batch_outcome(&Err(ApiError::Timeout("x".to_string()))),
            "timeout"
        );
    }
}
