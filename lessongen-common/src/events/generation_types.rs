//! Generation vocabulary type definitions
//!
//! Types shared by the orchestrator and every event consumer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output type of a generation job and of staged content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationType {
    Audio,
    Video,
}

impl GenerationType {
    /// Human-readable label used in auto-generated titles
    pub fn label(&self) -> &'static str {
        match self {
            GenerationType::Audio => "Audio",
            GenerationType::Video => "Video",
        }
    }
}

impl fmt::Display for GenerationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Backend job status
///
/// Ordered: `NotStarted < Submitted < InProgress < Completed | Failed`.
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    NotStarted,
    Submitted,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// Position in the status order; both terminal statuses share the top rank
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::NotStarted => 0,
            JobStatus::Submitted => 1,
            JobStatus::InProgress => 2,
            JobStatus::Completed | JobStatus::Failed => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::NotStarted => "NotStarted",
            JobStatus::Submitted => "Submitted",
            JobStatus::InProgress => "InProgress",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Orchestrator state machine
///
/// `Empty → Requesting(t) → InProgress(t) → Generated(t)`, with
/// `Overwriting(target)` entered only while an overwrite prompt is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "generation_type")]
pub enum GenerationState {
    /// Nothing requested, nothing staged
    Empty,
    /// Submission call in flight
    Requesting(GenerationType),
    /// Job accepted by the backend, waiting for a terminal progress event
    InProgress(GenerationType),
    /// Job finished; staged content of this type awaits save or discard
    Generated(GenerationType),
    /// Overwrite prompt open for switching to the target type
    Overwriting(GenerationType),
}

impl GenerationState {
    pub fn generation_type(&self) -> Option<GenerationType> {
        match self {
            GenerationState::Empty => None,
            GenerationState::Requesting(t)
            | GenerationState::InProgress(t)
            | GenerationState::Generated(t)
            | GenerationState::Overwriting(t) => Some(*t),
        }
    }

    /// True while a job is being requested or generated, or a prompt is open
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            GenerationState::Requesting(_)
                | GenerationState::InProgress(_)
                | GenerationState::Overwriting(_)
        )
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationState::Empty => f.write_str("Empty"),
            GenerationState::Requesting(t) => write!(f, "Requesting({})", t),
            GenerationState::InProgress(t) => write!(f, "InProgress({})", t),
            GenerationState::Generated(t) => write!(f, "Generated({})", t),
            GenerationState::Overwriting(t) => write!(f, "Overwriting({})", t),
        }
    }
}

/// Generated-but-unsaved output (at most one exists per session)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedContent {
    pub title: String,
    pub content_type: GenerationType,
    pub duration_seconds: u64,
    /// Placeholder until the material is persisted and its real size is known
    pub file_size_bytes: u64,
    /// Storage blob reference, possibly carrying a `?signature` suffix
    pub blob_name: String,
}

impl StagedContent {
    /// Blob name without any query/signature suffix
    pub fn clean_blob_name(&self) -> &str {
        clean_blob_name(&self.blob_name)
    }
}

/// Strip everything from the first `?` on
pub fn clean_blob_name(blob_name: &str) -> &str {
    blob_name.split('?').next().unwrap_or(blob_name)
}
