//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid JSON after cleanup: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("unexpected field type: {0}")]
    UnexpectedShape(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
