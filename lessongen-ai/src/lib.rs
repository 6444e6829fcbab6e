//! lessongen-ai library interface
//!
//! AI lesson content generation: source selection, generation settings,
//! the generation orchestrator and its collaborators. Exposed for the
//! `lessongen-ai` binary and for integration testing.

pub mod collaborators;
pub mod error;
pub mod models;
pub mod progress;
pub mod services;

pub use crate::collaborators::{Collaborators, LessonApiClient, OverwriteDecision};
pub use crate::error::{ApiError, GenerationError, GenerationResult};
pub use crate::progress::{GenerationSession, JobProgressChannel, ProgressBus};
pub use crate::services::{
    GenerateOutcome, GenerationOrchestrator, GenerationSettingsStore, NotReadyReason,
    PersistOutcome, SourceSelectionRegistry,
};

/// Progress stream path under the API base URL when none is configured
pub const DEFAULT_PROGRESS_PATH: &str = "lesson-contents/events";

/// Progress stream URL for `api_base_url` when none is configured
pub fn default_progress_url(api_base_url: &str) -> String {
    format!("{}/{}", api_base_url.trim_end_matches('/'), DEFAULT_PROGRESS_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_progress_url() {
        assert_eq!(
            default_progress_url("http://127.0.0.1:8080/api/"),
            "http://127.0.0.1:8080/api/lesson-contents/events"
        );
    }
}
