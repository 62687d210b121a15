//! Prometheus metrics for the OptiPredict gateway.
//!
//! # Security Note
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping.
//! Metrics carry no user ids or filenames, only aggregate counts. Restrict
//! the endpoint to the scraper at the network level anyway.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static BATCH_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "optipredict_batch_requests_total",
            "Batch prediction requests by outcome",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static UPLOAD_BYTES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "optipredict_upload_bytes_total",
        "Total bytes received in batch uploads",
    )
    .expect("metric creation failed")
});

pub static ROWS_TRUNCATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "optipredict_rows_truncated_total",
        "Result rows dropped from responses by the display cap",
    )
    .expect("metric creation failed")
});

pub static AUDIT_WRITE_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "optipredict_audit_write_failures_total",
        "Upload audit rows that failed to insert",
    )
    .expect("metric creation failed")
});

pub static UPSTREAM_RELAY_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "optipredict_upstream_relay_duration_seconds",
            "Time spent relaying a batch upload to the ML service",
        )
        .buckets(vec![
            0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0, 14400.0,
        ]),
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(BATCH_REQUESTS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOAD_BYTES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ROWS_TRUNCATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(AUDIT_WRITE_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPSTREAM_RELAY_DURATION.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record the outcome of one batch prediction request.
pub fn record_batch_outcome(outcome: &str) {
    BATCH_REQUESTS.with_label_values(&[outcome]).inc();
}
