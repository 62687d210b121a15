//! Inbound request timeouts.

use crate::error::ApiError;
use crate::metrics;
use crate::routes::PREDICT_FILE_PATH;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use optipredict_core::{BYTES_PER_MB, RouteClass};
use std::time::Duration;

/// Classify a request path for timeout selection.
pub fn classify_route(path: &str) -> RouteClass {
    if path == PREDICT_FILE_PATH {
        RouteClass::BatchUpload
    } else {
        RouteClass::Standard
    }
}

/// Bound each request by the tier chosen from its declared size.
///
/// Runs before the body is read. On expiry the handler future is dropped,
/// which releases any scratch file it holds.
pub async fn timeout_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let route = classify_route(req.uri().path());
    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok());
    let limit = state.timeouts.for_request(route, declared);

    match tokio::time::timeout(limit, next.run(req)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(
                route = ?route,
                timeout_secs = limit.as_secs(),
                "Request exceeded inbound timeout"
            );
            if route == RouteClass::BatchUpload {
                metrics::record_batch_outcome("timeout");
            }
            ApiError::Timeout(format!(
                "Permintaan melebihi batas waktu {}",
                describe_duration(limit)
            ))
            .into_response()
        }
    }
}

/// Guidance text for a relay that outlived its tier.
pub fn relay_timeout_message(size_bytes: u64, limit: Duration) -> String {
    let size_mb = size_bytes as f64 / BYTES_PER_MB as f64;
    format!(
        "Pemrosesan file {size_mb:.1} MB melebihi batas waktu {}. \
         Coba bagi file menjadi beberapa bagian yang lebih kecil lalu unggah ulang.",
        describe_duration(limit)
    )
}

/// Render a duration in the largest whole unit.
fn describe_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 && secs % 3600 == 0 {
        format!("{} jam", secs / 3600)
    } else if secs >= 60 && secs % 60 == 0 {
        format!("{} menit", secs / 60)
    } else {
        format!("{secs} detik")
    }
}
