//! Job progress reconciliation
//!
//! Decides what a progress event means for the tracked job without touching
//! any state, so the orchestrator can apply the outcome under one lock. The
//! rules make repeated and late deliveries harmless:
//!
//! - events for another job id are ignored
//! - once the job is terminal, every further event is ignored
//! - a status at or below the current one is ignored
//! - `Completed` without a failure reason and with an output blob completes
//! - `Completed` with a failure reason, or `Failed`, fails

use crate::models::{GenerationJob, JobProgressEvent};
use lessongen_common::events::JobStatus;

/// Failure text when the backend gives none
pub const DEFAULT_FAILURE_REASON: &str = "Generation failed";

/// Failure text for a completed job that reported no output
pub const MISSING_OUTPUT_REASON: &str = "Generation completed without an output file";

/// Why an event had no effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No job tracked, or the event is for a different job
    UnknownJob,
    /// Tracked job already reached Completed/Failed
    AlreadyTerminal,
    /// Same status delivered again
    Duplicate,
    /// Status lower than the one already recorded
    OutOfOrder,
}

/// Effect of one progress event on the tracked job
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressDecision {
    Ignore(IgnoreReason),
    /// Non-terminal step forward
    Progress(JobStatus),
    /// Output ready to be staged
    Complete {
        blob_name: String,
        duration_seconds: u64,
        actual_duration_seconds: Option<f64>,
    },
    Fail { reason: String },
}

/// Classify `event` against the currently tracked job
pub fn reconcile(job: Option<&GenerationJob>, event: &JobProgressEvent) -> ProgressDecision {
    let job = match job {
        Some(job) if job.job_id == event.job_id => job,
        _ => return ProgressDecision::Ignore(IgnoreReason::UnknownJob),
    };

    if job.is_terminal() {
        return ProgressDecision::Ignore(IgnoreReason::AlreadyTerminal);
    }
    if event.status == job.status {
        return ProgressDecision::Ignore(IgnoreReason::Duplicate);
    }
    if event.status.rank() < job.status.rank() {
        return ProgressDecision::Ignore(IgnoreReason::OutOfOrder);
    }

    match event.status {
        // Rank 0 can only equal or trail the job status, handled above
        JobStatus::NotStarted => ProgressDecision::Ignore(IgnoreReason::OutOfOrder),
        JobStatus::Submitted | JobStatus::InProgress => ProgressDecision::Progress(event.status),
        JobStatus::Completed => {
            if let Some(reason) = event.failure() {
                return ProgressDecision::Fail {
                    reason: reason.to_string(),
                };
            }
            match event.output_blob_url(job.generation_type) {
                Some(blob_name) => ProgressDecision::Complete {
                    blob_name: blob_name.to_string(),
                    duration_seconds: round_duration(event.actual_duration_seconds),
                    actual_duration_seconds: event.actual_duration_seconds,
                },
                None => ProgressDecision::Fail {
                    reason: MISSING_OUTPUT_REASON.to_string(),
                },
            }
        }
        JobStatus::Failed => ProgressDecision::Fail {
            reason: event
                .failure()
                .unwrap_or(DEFAULT_FAILURE_REASON)
                .to_string(),
        },
    }
}

/// Whole seconds, rounded half away from zero; missing, negative or NaN → 0
pub fn round_duration(seconds: Option<f64>) -> u64 {
    // f64 → u64 casts saturate and map NaN to 0
    seconds.unwrap_or(0.0).round() as u64
}
