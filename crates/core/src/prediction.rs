//! Batch prediction response model.

use crate::error::{Error, Result};
use crate::truncate::truncate_results;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields the ML service must return for a batch prediction.
pub const REQUIRED_FIELDS: [&str; 5] = [
    "success",
    "message",
    "total_rows",
    "processed_rows",
    "results",
];

/// A batch prediction as returned by the ML service, after sanitization.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamPrediction {
    pub success: bool,
    pub message: String,
    pub total_rows: u64,
    pub processed_rows: u64,
    #[serde(default)]
    pub valid_rows: Option<u64>,
    #[serde(default)]
    pub processing_time: Value,
    pub results: Vec<Value>,
}

impl UpstreamPrediction {
    /// Validate and decode a sanitized upstream value.
    ///
    /// A required field that is absent or null is reported as missing. Null
    /// counts because sanitization turns a non-finite count into null.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = &value else {
            return Err(Error::NotAnObject(json_kind(&value)));
        };

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|field| map.get(**field).is_none_or(Value::is_null))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingFields(missing));
        }

        serde_json::from_value(value).map_err(|e| Error::UnexpectedShape(e.to_string()))
    }

    /// Valid row count, 0 when the service omitted it.
    pub fn valid_rows(&self) -> u64 {
        self.valid_rows.unwrap_or(0)
    }
}

/// The body returned to clients for `POST /api/predict-file`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPredictionResponse {
    pub success: bool,
    pub message: String,
    pub total_rows: u64,
    pub processed_rows: u64,
    pub valid_rows: u64,
    pub displayed_rows: u64,
    pub is_limited: bool,
    pub user_id: i64,
    pub processing_time: Value,
    pub results: Vec<Value>,
}

impl BatchPredictionResponse {
    /// Build the client response, truncating results if needed.
    pub fn from_upstream(upstream: UpstreamPrediction, user_id: i64) -> Self {
        let valid_rows = upstream.valid_rows();
        let truncated = truncate_results(upstream.results, &upstream.message, upstream.total_rows);
        Self {
            success: upstream.success,
            message: truncated.message,
            total_rows: upstream.total_rows,
            processed_rows: upstream.processed_rows,
            valid_rows,
            displayed_rows: truncated.rows.len() as u64,
            is_limited: truncated.is_limited,
            user_id,
            processing_time: upstream.processing_time,
            results: truncated.rows,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
