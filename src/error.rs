//! Error types for ds-forge operations.
//!
//! Defines error types for the collaborators the pipeline depends on:
//! - LLM transport (HTTP, provider responses)
//! - Dataset analysis (reading and summarizing tabular input)
//! - Structured inference (turning model text into typed results)
//! - Configuration loading

use thiserror::Error;

/// Errors that can occur while talking to an LLM provider.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

impl LlmError {
    /// Whether a second request has a realistic chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::RequestFailed(_) | LlmError::RateLimited(_) => true,
            LlmError::ApiError { code, .. } => *code >= 500,
            LlmError::ParseError(_) => false,
        }
    }
}

/// Errors raised while reading or summarizing a dataset.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Dataset '{dataset}' could not be read: {reason}")]
    Unreadable { dataset: String, reason: String },

    #[error("Dataset '{dataset}' is malformed: {reason}")]
    Malformed { dataset: String, reason: String },

    #[error("Dataset '{0}' has no header row")]
    MissingHeader(String),

    #[error("Dataset '{0}' contains no data rows")]
    Empty(String),
}

/// Errors raised by the structured inference layer.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("LLM transport error: {0}")]
    Transport(#[from] LlmError),

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Response does not match schema '{schema}': {reason}")]
    InvalidStructure { schema: String, reason: String },

    #[error("No valid '{schema}' result after {attempts} attempts: {last_error}")]
    Exhausted {
        schema: String,
        attempts: u32,
        last_error: String,
    },
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::RequestFailed("reset".into()).is_transient());
        assert!(LlmError::RateLimited("slow down".into()).is_transient());
        assert!(LlmError::ApiError {
            code: 503,
            message: "unavailable".into()
        }
        .is_transient());
        assert!(!LlmError::ApiError {
            code: 401,
            message: "unauthorized".into()
        }
        .is_transient());
        assert!(!LlmError::ParseError("bad json".into()).is_transient());
    }

    #[test]
    fn test_inference_error_display() {
        let err = InferenceError::Exhausted {
            schema: "verdict".into(),
            attempts: 3,
            last_error: "missing field".into(),
        };
        let text = err.to_string();
        assert!(text.contains("verdict"));
        assert!(text.contains("3 attempts"));
    }
}
