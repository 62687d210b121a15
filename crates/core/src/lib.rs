//! Core domain types and shared logic for the OptiPredict gateway.
//!
//! This crate holds everything that does not touch the network or a database:
//! - Configuration types shared across crates
//! - Repair and sanitization of ML service JSON payloads
//! - Size-tiered timeout selection for uploads
//! - Result truncation for oversized prediction batches
//! - The prediction response model returned to clients

pub mod config;
pub mod error;
pub mod prediction;
pub mod sanitize;
pub mod timeout;
pub mod truncate;

pub use error::{Error, Result};
pub use prediction::{BatchPredictionResponse, UpstreamPrediction};
pub use sanitize::{preclean, sanitize, sanitize_value};
pub use timeout::{RouteClass, TimeoutPolicy, TimeoutTier};
pub use truncate::{MAX_DISPLAYED_ROWS, Truncated, truncate_results};

/// One megabyte as used by upload size tiers (1 MiB).
pub const BYTES_PER_MB: u64 = 1024 * 1024;
