//! HTTP gateway between OptiPredict clients and the ML prediction service.
//!
//! This crate provides:
//! - Batch file upload with size-tiered timeouts and scratch cleanup
//! - Relay of prediction, history and health calls to the ML service
//! - Upload audit records in the metadata store
//! - JWT authentication

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod scratch;
pub mod state;
pub mod timeout;
pub mod upstream;

pub use auth::{AuthenticatedUser, TokenVerifier, TraceId};
pub use error::ApiError;
pub use routes::create_router;
pub use scratch::{ScratchFile, ScratchStore};
pub use state::AppState;
pub use upstream::MlClient;
