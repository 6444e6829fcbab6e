//! Generation job tracking
//!
//! A job is created when a generation request is submitted. Its status only
//! moves forward: `NotStarted → Submitted → InProgress → Completed | Failed`.

use chrono::{DateTime, Utc};
use lessongen_common::events::{GenerationType, JobStatus};
use serde::{Deserialize, Serialize};

/// One backend-tracked generation request (in-memory, session scoped)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationJob {
    pub job_id: String,
    pub generation_type: GenerationType,
    pub status: JobStatus,
    pub failure_reason: Option<String>,
    pub output_blob_url: Option<String>,
    pub actual_duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
    /// Set when a terminal status is reached
    pub ended_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    pub fn new(job_id: impl Into<String>, generation_type: GenerationType) -> Self {
        Self {
            job_id: job_id.into(),
            generation_type,
            status: JobStatus::NotStarted,
            failure_reason: None,
            output_blob_url: None,
            actual_duration_seconds: None,
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Move to `status` if that is a forward step
    ///
    /// Returns false (and leaves the job untouched) for regressions, repeats,
    /// and anything after a terminal status.
    pub fn advance_to(&mut self, status: JobStatus) -> bool {
        if self.is_terminal() || status.rank() <= self.status.rank() {
            return false;
        }
        self.status = status;
        if status.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
        true
    }

    pub fn mark_completed(&mut self, output_blob_url: String, actual_duration_seconds: Option<f64>) {
        if self.advance_to(JobStatus::Completed) {
            self.output_blob_url = Some(output_blob_url);
            self.actual_duration_seconds = actual_duration_seconds;
        }
    }

    pub fn mark_failed(&mut self, reason: String) {
        if self.advance_to(JobStatus::Failed) {
            self.failure_reason = Some(reason);
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Job status event as delivered by the progress channel
///
/// May be delivered more than once; the orchestrator absorbs repeats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_output_blob_name_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_output_blob_name_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration_seconds: Option<f64>,
}

impl JobProgressEvent {
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            failure_reason: None,
            audio_output_blob_name_url: None,
            video_output_blob_name_url: None,
            actual_duration_seconds: None,
        }
    }

    /// Failure reason, if one was given and is not blank
    pub fn failure(&self) -> Option<&str> {
        self.failure_reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
    }

    /// Output blob for the given type, falling back to the other type's field
    pub fn output_blob_url(&self, generation_type: GenerationType) -> Option<&str> {
        let (preferred, fallback) = match generation_type {
            GenerationType::Audio => (&self.audio_output_blob_name_url, &self.video_output_blob_name_url),
            GenerationType::Video => (&self.video_output_blob_name_url, &self.audio_output_blob_name_url),
        };
        fn non_empty(url: &Option<String>) -> Option<&str> {
            url.as_deref().filter(|url| !url.is_empty())
        }
        non_empty(preferred).or_else(|| non_empty(fallback))
    }
}
