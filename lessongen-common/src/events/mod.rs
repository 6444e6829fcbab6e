//! Event types for the lessongen event system
//!
//! Provides the generation event definitions and the EventBus the
//! orchestrator publishes its transitions on.

mod generation_types;

pub use generation_types::{
    clean_blob_name, GenerationState, GenerationType, JobStatus, StagedContent,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Generation session event types
///
/// Every notification the orchestrator produces goes through this enum, so
/// consumers subscribe instead of polling orchestrator state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GenerationEvent {
    /// Orchestrator state machine transition
    StateChanged {
        session_id: Uuid,
        old_state: GenerationState,
        new_state: GenerationState,
        timestamp: DateTime<Utc>,
    },

    /// Backend accepted a generation job
    JobSubmitted {
        session_id: Uuid,
        job_id: String,
        generation_type: GenerationType,
        timestamp: DateTime<Utc>,
    },

    /// Non-terminal progress for the tracked job
    JobProgress {
        session_id: Uuid,
        job_id: String,
        status: JobStatus,
        timestamp: DateTime<Utc>,
    },

    /// Job completed; content is staged and awaits save or discard
    ContentGenerated {
        session_id: Uuid,
        job_id: String,
        content: StagedContent,
        timestamp: DateTime<Utc>,
    },

    /// Job failed (terminal Failed, or Completed with a failure reason)
    GenerationFailed {
        session_id: Uuid,
        job_id: String,
        generation_type: GenerationType,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Backend rejected a job submission
    SubmissionFailed {
        session_id: Uuid,
        generation_type: GenerationType,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Staged content persisted as a lesson material
    ContentSaved {
        session_id: Uuid,
        title: String,
        folder_id: String,
        source_url: String,
        timestamp: DateTime<Utc>,
    },

    /// Persisting staged content failed; content stays staged
    PersistFailed {
        session_id: Uuid,
        title: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Staged content dropped without persistence
    StagedContentDiscarded {
        session_id: Uuid,
        content_type: GenerationType,
        timestamp: DateTime<Utc>,
    },

    /// Session torn down; later completions are ignored
    SessionClosed {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl GenerationEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            GenerationEvent::StateChanged { .. } => "StateChanged",
            GenerationEvent::JobSubmitted { .. } => "JobSubmitted",
            GenerationEvent::JobProgress { .. } => "JobProgress",
            GenerationEvent::ContentGenerated { .. } => "ContentGenerated",
            GenerationEvent::GenerationFailed { .. } => "GenerationFailed",
            GenerationEvent::SubmissionFailed { .. } => "SubmissionFailed",
            GenerationEvent::ContentSaved { .. } => "ContentSaved",
            GenerationEvent::PersistFailed { .. } => "PersistFailed",
            GenerationEvent::StagedContentDiscarded { .. } => "StagedContentDiscarded",
            GenerationEvent::SessionClosed { .. } => "SessionClosed",
        }
    }

    /// Session that produced the event
    pub fn session_id(&self) -> Uuid {
        match self {
            GenerationEvent::StateChanged { session_id, .. }
            | GenerationEvent::JobSubmitted { session_id, .. }
            | GenerationEvent::JobProgress { session_id, .. }
            | GenerationEvent::ContentGenerated { session_id, .. }
            | GenerationEvent::GenerationFailed { session_id, .. }
            | GenerationEvent::SubmissionFailed { session_id, .. }
            | GenerationEvent::ContentSaved { session_id, .. }
            | GenerationEvent::PersistFailed { session_id, .. }
            | GenerationEvent::StagedContentDiscarded { session_id, .. }
            | GenerationEvent::SessionClosed { session_id, .. } => *session_id,
        }
    }

    /// True for notifications a user should see (failures)
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            GenerationEvent::GenerationFailed { .. }
                | GenerationEvent::SubmissionFailed { .. }
                | GenerationEvent::PersistFailed { .. }
        )
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block the orchestrator)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use lessongen_common::events::{EventBus, GenerationEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(GenerationEvent::SessionClosed {
///     session_id: uuid::Uuid::new_v4(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// let received = rx.try_recv().expect("event should be delivered");
/// assert_eq!(received.event_type(), "SessionClosed");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GenerationEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered per subscriber before the
    /// oldest are dropped for lagging receivers.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: GenerationEvent,
    ) -> Result<usize, broadcast::error::SendError<GenerationEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: GenerationEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
