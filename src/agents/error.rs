//! Error types for worker operations.

use thiserror::Error;

use crate::error::{AnalysisError, InferenceError};

/// Errors a worker can raise from `analyze` or `execute`.
///
/// A Critic rejecting a candidate is *not* an error; it is an ordinary
/// [`Verdict`](super::types::Verdict) value.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The local analysis step could not interpret its context.
    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    /// The inference collaborator gave up.
    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),
}

impl WorkerError {
    /// Short label for the failing step.
    pub fn step(&self) -> &'static str {
        match self {
            WorkerError::Analysis(_) => "analyze",
            WorkerError::Inference(_) => "execute",
        }
    }
}

/// Result type alias for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;
