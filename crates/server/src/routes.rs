//! Route configuration.

use crate::auth::auth_middleware;
use crate::error::ApiError;
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::timeout::timeout_middleware;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

/// Path of the batch upload route. Timeout selection keys off it.
pub const PREDICT_FILE_PATH: &str = "/api/predict-file";

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.config.server.max_upload_bytes_usize();

    let api_routes = Router::new()
        // Unauthenticated for load balancer probes
        .route("/api/health", get(handlers::health))
        .route(
            PREDICT_FILE_PATH,
            post(handlers::predict_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/predict",
            post(handlers::predict).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/predictions", get(handlers::predictions))
        .route("/api/predictions/count", get(handlers::prediction_count))
        .route("/api/predictions/all", delete(handlers::delete_predictions))
        .route("/api/uploads", get(handlers::list_uploads))
        .route("/api/ml-health", get(handlers::ml_health));

    let mut router = Router::new().merge(api_routes);

    // When enabled, /metrics must be network-restricted to the scraper.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    // Execution order: TraceLayer -> Auth -> Timeout -> Handler
    router
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            timeout_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
