//! Generation session lifetime
//!
//! Couples an orchestrator to its progress channel for as long as the
//! generation panel is open. Shutting down cancels the pump, closes the
//! orchestrator and releases the channel; no event is applied afterwards.

use super::JobProgressChannel;
use crate::services::orchestrator::GenerationOrchestrator;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Running session: orchestrator plus the task feeding it progress events
pub struct GenerationSession {
    orchestrator: Arc<GenerationOrchestrator>,
    cancel: CancellationToken,
    pump: JoinHandle<()>,
}

impl GenerationSession {
    /// Start delivering events from `channel` to `orchestrator`
    pub fn spawn<C>(orchestrator: Arc<GenerationOrchestrator>, mut channel: C) -> Self
    where
        C: JobProgressChannel + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let target = Arc::clone(&orchestrator);
        let session_id = orchestrator.session_id();

        let pump = tokio::spawn(async move {
            debug!(session_id = %session_id, "Progress pump started");
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!(session_id = %session_id, "Progress pump cancelled");
                        break;
                    }
                    event = channel.recv() => match event {
                        Some(event) => {
                            let disposition = target.on_job_progress(event);
                            debug!(session_id = %session_id, ?disposition, "Progress event applied");
                        }
                        None => {
                            info!(session_id = %session_id, "Progress channel ended");
                            break;
                        }
                    },
                }
            }
            // Releases the subscription (closes an SSE connection)
            drop(channel);
        });

        info!(session_id = %session_id, "Generation session started");
        Self {
            orchestrator,
            cancel,
            pump,
        }
    }

    pub fn orchestrator(&self) -> &Arc<GenerationOrchestrator> {
        &self.orchestrator
    }

    /// Token cancelled when the session shuts down
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the pump is still delivering events
    pub fn is_running(&self) -> bool {
        !self.pump.is_finished()
    }

    /// Stop the pump, close the orchestrator and wait for the pump to exit
    pub async fn shutdown(self) {
        let session_id = self.orchestrator.session_id();
        self.cancel.cancel();
        self.orchestrator.close();

        if let Err(e) = self.pump.await {
            warn!(session_id = %session_id, "Progress pump ended abnormally: {}", e);
        }
        info!(session_id = %session_id, "Generation session shut down");
    }
}
