//! Data models for lessongen-ai
//!
//! - Source documents offered as generation input
//! - Generation settings snapshot
//! - Generation job tracking and progress events

pub mod job;
pub mod settings;
pub mod source_item;

pub use job::{GenerationJob, JobProgressEvent};
pub use lessongen_common::events::{GenerationState, GenerationType, JobStatus, StagedContent};
pub use settings::{GenerationSettings, VoiceConfig};
pub use source_item::{SourceItem, SourceKind};
