//! Error types for Glyco Insights
//!
//! Missing data is never an error here. A record without a field, a history
//! without entries or a date that does not parse all surface as `None` or an
//! empty collection. Only invalid configuration and malformed payloads fail.

use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Non-finite value for {metric}: {value}")]
    NonFiniteValue { metric: String, value: f64 },

    #[error("Failed to parse payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl ComputeError {
    pub(crate) fn non_finite(metric: &str, value: f64) -> Self {
        ComputeError::NonFiniteValue {
            metric: metric.to_string(),
            value,
        }
    }
}
