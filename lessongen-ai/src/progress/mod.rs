//! Job progress delivery
//!
//! A `JobProgressChannel` yields backend job status events in delivery
//! order. Two implementations:
//!
//! - `ProgressBus`: in-process channel, for embedding callers and tests
//! - `sse::SseProgressChannel`: server-sent event stream from the backend
//!
//! `session::GenerationSession` pumps a channel into an orchestrator.

use crate::models::JobProgressEvent;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

pub mod session;
pub mod sse;

pub use session::GenerationSession;
pub use sse::SseProgressChannel;

/// Source of job progress events
///
/// Events may repeat or arrive late; receivers must tolerate both.
#[async_trait]
pub trait JobProgressChannel: Send {
    /// Next event, or `None` once the channel has ended
    async fn recv(&mut self) -> Option<JobProgressEvent>;
}

/// In-process progress channel
///
/// Unbounded so a publisher never waits on a slow session.
pub struct ProgressBus;

impl ProgressBus {
    /// Create a connected publisher/subscription pair
    pub fn channel() -> (ProgressPublisher, ProgressSubscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ProgressPublisher { tx }, ProgressSubscription { rx })
    }
}

/// Sending half of a `ProgressBus`
#[derive(Debug, Clone)]
pub struct ProgressPublisher {
    tx: mpsc::UnboundedSender<JobProgressEvent>,
}

impl ProgressPublisher {
    /// Publish an event; false once the subscription is gone
    pub fn publish(&self, event: JobProgressEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                debug!(job_id = %event.job_id, "No progress subscriber; event dropped");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of a `ProgressBus`
#[derive(Debug)]
pub struct ProgressSubscription {
    rx: mpsc::UnboundedReceiver<JobProgressEvent>,
}

#[async_trait]
impl JobProgressChannel for ProgressSubscription {
    async fn recv(&mut self) -> Option<JobProgressEvent> {
        self.rx.recv().await
    }
}
