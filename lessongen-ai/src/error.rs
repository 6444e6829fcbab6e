//! Error types for lessongen-ai
//!
//! Every external call returns a tagged `ApiError` kind; orchestrator
//! operations wrap it in `GenerationError` naming the step that failed.
//! Validation gating is not an error (see `GenerateOutcome::NotReady`).

use thiserror::Error;

/// Failure kind of one collaborator call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Server answered with a non-success status
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Request never produced a response (connect, timeout, stream error)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response arrived but could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Rejected {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Orchestrator operation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Job submission gateway rejected the request; state unchanged
    #[error("Job submission failed: {0}")]
    Submission(ApiError),

    /// Lesson material save failed; staged content kept for retry
    #[error("Saving generated content failed: {0}")]
    Persistence(ApiError),

    /// Session was torn down while the operation was in flight
    #[error("Generation session closed")]
    SessionClosed,
}

/// Result type for orchestrator operations
pub type GenerationResult<T> = Result<T, GenerationError>;
