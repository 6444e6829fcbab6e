//! Generation orchestrator
//!
//! Session-scoped state machine that turns the selected sources and settings
//! into a generation job, follows the job through progress events, and keeps
//! at most one generated-but-unsaved result staged.
//!
//! ```text
//! Empty ──confirm──▶ Requesting(t) ──accepted──▶ InProgress(t) ──Completed──▶ Generated(t)
//!   ▲                     │ rejected                  │ Failed                    │
//!   └─────────────────────┴───────────────────────────┘                           │
//!   ▲                                                                             │
//!   └──── save / discard ◀──── Overwriting(u) ◀──── confirm(u ≠ t) ◀──────────────┘
//! ```
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! await. Collaborator calls run unlocked; while one is pending the session
//! reports `is_loading()` and refuses new generate and persist requests
//! instead of queueing them.

use crate::collaborators::{
    Collaborators, ConfirmContentRequest, CreateLessonMaterialsRequest, OverwriteDecision,
};
use crate::error::{GenerationError, GenerationResult};
use crate::models::{GenerationJob, GenerationSettings, JobProgressEvent};
use crate::services::auto_title::auto_title;
use crate::services::reconciliation::{reconcile, IgnoreReason, ProgressDecision};
use crate::services::settings_store::GenerationSettingsStore;
use crate::services::source_registry::SourceSelectionRegistry;
use chrono::Utc;
use lessongen_common::events::{
    EventBus, GenerationEvent, GenerationState, GenerationType, JobStatus, StagedContent,
};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Size recorded for staged content until the material store reports the real one
pub const PLACEHOLDER_FILE_SIZE_BYTES: u64 = 1;

/// Why a request was refused without being attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    /// A request is in flight, a job is running, or a prompt is open
    Loading,
    /// Voice, speaking rate, language or destination folder missing
    SettingsIncomplete,
    /// No source is checked
    NoSourcesSelected,
    /// Sources are checked but none is usable yet (still uploading)
    SourcesUploading,
    /// Content of the requested type is already staged
    AlreadyGenerated,
    /// Nothing staged to persist
    NothingStaged,
    /// Persist requested without a destination folder
    NoDestinationFolder,
    /// Session was torn down
    SessionClosed,
}

/// Result of `confirm_generate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// Backend accepted the job
    Submitted { job_id: String },
    /// Gated; nothing was attempted
    NotReady(NotReadyReason),
    /// Overwrite prompt dismissed; staged content untouched
    Dismissed,
}

/// Result of `persist_staged_content`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Saved { source_url: String },
    NotReady(NotReadyReason),
}

/// What a progress event did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Ignored(IgnoreReason),
    /// Session closed; event dropped
    Dropped,
    Progressed(JobStatus),
    Generated,
    Failed,
}

/// Mutable session state (guarded by the orchestrator's mutex)
#[derive(Debug)]
struct SessionInner {
    state: GenerationState,
    job: Option<GenerationJob>,
    staged: Option<StagedContent>,
    /// Collaborator call pending
    request_in_flight: bool,
    closed: bool,
    last_error: Option<String>,
    sources: SourceSelectionRegistry,
    settings: GenerationSettingsStore,
}

impl SessionInner {
    fn is_loading(&self) -> bool {
        self.request_in_flight || self.state.is_busy()
    }

    /// First reason `confirm_generate(generation_type)` may not run
    fn generate_blocker(&self, generation_type: GenerationType) -> Option<NotReadyReason> {
        if self.closed {
            Some(NotReadyReason::SessionClosed)
        } else if self.is_loading() {
            Some(NotReadyReason::Loading)
        } else if !self.settings.is_complete() {
            Some(NotReadyReason::SettingsIncomplete)
        } else if self.sources.total_checked_sources() == 0 {
            Some(NotReadyReason::NoSourcesSelected)
        } else if self.sources.checked_files().next().is_none() {
            Some(NotReadyReason::SourcesUploading)
        } else if self.state == GenerationState::Generated(generation_type) {
            Some(NotReadyReason::AlreadyGenerated)
        } else {
            None
        }
    }

    fn is_tracking(&self, job_id: &str) -> bool {
        self.job.as_ref().is_some_and(|job| job.job_id == job_id)
    }
}

/// Session-scoped generation state machine
pub struct GenerationOrchestrator {
    session_id: Uuid,
    inner: Mutex<SessionInner>,
    collaborators: Collaborators,
    event_bus: EventBus,
}

/// Clears `request_in_flight` when a collaborator call ends, however it ends
struct RequestGuard<'a> {
    orchestrator: &'a GenerationOrchestrator,
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.lock().request_in_flight = false;
    }
}

/// Job tracked and marked in flight, ready to be sent to the gateway
struct PreparedSubmission<'a> {
    job_id: String,
    generation_type: GenerationType,
    request: ConfirmContentRequest,
    guard: RequestGuard<'a>,
}

impl GenerationOrchestrator {
    pub fn new(collaborators: Collaborators, event_bus: EventBus) -> Self {
        Self::with_settings(collaborators, event_bus, GenerationSettingsStore::new())
    }

    /// Start a session with pre-filled settings
    pub fn with_settings(
        collaborators: Collaborators,
        event_bus: EventBus,
        settings: GenerationSettingsStore,
    ) -> Self {
        let session_id = Uuid::new_v4();
        info!(session_id = %session_id, "Generation session created");

        Self {
            session_id,
            inner: Mutex::new(SessionInner {
                state: GenerationState::Empty,
                job: None,
                staged: None,
                request_in_flight: false,
                closed: false,
                last_error: None,
                sources: SourceSelectionRegistry::new(),
                settings,
            }),
            collaborators,
            event_bus,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark a collaborator call as started; the guard ends it
    fn begin_request(&self, inner: &mut SessionInner) -> RequestGuard<'_> {
        inner.request_in_flight = true;
        RequestGuard { orchestrator: self }
    }

    // ========================================
    // Queries
    // ========================================

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> GenerationState {
        self.lock().state
    }

    pub fn staged_content(&self) -> Option<StagedContent> {
        self.lock().staged.clone()
    }

    pub fn current_job(&self) -> Option<GenerationJob> {
        self.lock().job.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Most recent failure surfaced to the user
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn settings(&self) -> GenerationSettings {
        self.lock().settings.snapshot()
    }

    /// Whether `confirm_generate(generation_type)` would be attempted now
    pub fn can_generate(&self, generation_type: GenerationType) -> bool {
        self.lock().generate_blocker(generation_type).is_none()
    }

    /// Subscribe to this session's transition notifications
    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.event_bus.subscribe()
    }

    // ========================================
    // Selection and settings
    // ========================================

    /// Read or mutate the source selection under the session lock
    pub fn edit_sources<R>(&self, f: impl FnOnce(&mut SourceSelectionRegistry) -> R) -> R {
        f(&mut self.lock().sources)
    }

    /// Read or mutate the settings under the session lock
    pub fn edit_settings<R>(&self, f: impl FnOnce(&mut GenerationSettingsStore) -> R) -> R {
        f(&mut self.lock().settings)
    }

    // ========================================
    // Operations
    // ========================================

    /// Generate content of `generation_type`
    ///
    /// Refused (`NotReady`) while loading, with incomplete settings, with no
    /// checked source, or when that type is already generated. If content of
    /// another type is staged, the overwrite prompt decides whether it is
    /// saved or discarded first; the new job is never submitted before the
    /// prompt has been answered.
    pub async fn confirm_generate(
        &self,
        generation_type: GenerationType,
    ) -> GenerationResult<GenerateOutcome> {
        let staged_to_replace = {
            let mut inner = self.lock();
            if let Some(reason) = inner.generate_blocker(generation_type) {
                debug!(
                    session_id = %self.session_id,
                    ?generation_type,
                    ?reason,
                    "Generate request not ready"
                );
                return Ok(GenerateOutcome::NotReady(reason));
            }

            match inner.staged.clone() {
                Some(staged) if staged.content_type != generation_type => {
                    // Overwriting is busy, so nothing else starts while the prompt is open
                    self.transition(&mut inner, GenerationState::Overwriting(generation_type));
                    Ok(staged)
                }
                Some(_) => return Ok(GenerateOutcome::NotReady(NotReadyReason::AlreadyGenerated)),
                None => Err(self.prepare_submission(&mut inner, generation_type)),
            }
        };

        let staged = match staged_to_replace {
            Ok(staged) => staged,
            Err(prepared) => return self.send_submission(prepared).await,
        };

        if let Some(outcome) = self.resolve_overwrite(staged, generation_type).await? {
            return Ok(outcome);
        }

        let prepared = {
            let mut inner = self.lock();
            if inner.closed {
                return Ok(GenerateOutcome::NotReady(NotReadyReason::SessionClosed));
            }
            self.prepare_submission(&mut inner, generation_type)
        };
        self.send_submission(prepared).await
    }

    /// Run the overwrite prompt; `Some(outcome)` ends the generate request
    async fn resolve_overwrite(
        &self,
        staged: StagedContent,
        target: GenerationType,
    ) -> GenerationResult<Option<GenerateOutcome>> {
        info!(
            session_id = %self.session_id,
            staged_type = ?staged.content_type,
            target_type = ?target,
            "Staged content would be replaced; asking for confirmation"
        );

        let decision = self
            .collaborators
            .confirmer
            .confirm_overwrite(&staged, target)
            .await;

        info!(session_id = %self.session_id, ?decision, "Overwrite prompt answered");

        {
            let mut inner = self.lock();
            if inner.closed {
                return Ok(Some(GenerateOutcome::NotReady(NotReadyReason::SessionClosed)));
            }
            if inner.staged.as_ref() != Some(&staged) {
                // Slot changed under the prompt; the answer no longer applies to it
                warn!(
                    session_id = %self.session_id,
                    "Staged content changed while the overwrite prompt was open"
                );
                self.transition(&mut inner, GenerationState::Empty);
                return Ok(Some(match decision {
                    OverwriteDecision::Dismiss => GenerateOutcome::Dismissed,
                    _ => GenerateOutcome::NotReady(NotReadyReason::NothingStaged),
                }));
            }
        }

        match decision {
            OverwriteDecision::Dismiss => {
                if self.is_closed() {
                    return Ok(Some(GenerateOutcome::NotReady(NotReadyReason::SessionClosed)));
                }
                self.restore_generated(target, staged.content_type);
                Ok(Some(GenerateOutcome::Dismissed))
            }
            OverwriteDecision::Discard => {
                let mut inner = self.lock();
                if inner.closed {
                    return Ok(Some(GenerateOutcome::NotReady(NotReadyReason::SessionClosed)));
                }
                self.discard_locked(&mut inner);
                Ok(None)
            }
            OverwriteDecision::SaveFirst => {
                let save_target = {
                    let mut inner = self.lock();
                    if inner.closed {
                        return Ok(Some(GenerateOutcome::NotReady(NotReadyReason::SessionClosed)));
                    }
                    let folder_id = inner.settings.destination_folder_id().map(str::to_string);
                    folder_id.map(|folder_id| (folder_id, self.begin_request(&mut inner)))
                };
                let Some((folder_id, guard)) = save_target else {
                    self.restore_generated(target, staged.content_type);
                    return Ok(Some(GenerateOutcome::NotReady(
                        NotReadyReason::NoDestinationFolder,
                    )));
                };

                match self.persist(staged.clone(), folder_id, guard).await {
                    Ok(_) => Ok(None),
                    Err(GenerationError::SessionClosed) => Err(GenerationError::SessionClosed),
                    Err(err) => {
                        self.restore_generated(target, staged.content_type);
                        Err(err)
                    }
                }
            }
        }
    }

    /// Leave `Overwriting(target)` back to `Generated(staged_type)`
    fn restore_generated(&self, target: GenerationType, staged_type: GenerationType) {
        let mut inner = self.lock();
        if !inner.closed && inner.state == GenerationState::Overwriting(target) {
            self.transition(&mut inner, GenerationState::Generated(staged_type));
        }
    }

    /// Track a new job and move to `Requesting` (under the session lock)
    fn prepare_submission(
        &self,
        inner: &mut SessionInner,
        generation_type: GenerationType,
    ) -> Result<PreparedSubmission<'_>, NotReadyReason> {
        // Settings are re-read here since they may change while a prompt is open
        let Some(voice_config) = inner.settings.snapshot().voice_config() else {
            self.transition(inner, GenerationState::Empty);
            return Err(NotReadyReason::SettingsIncomplete);
        };

        let job_id = Uuid::new_v4().to_string();
        let request = ConfirmContentRequest {
            generation_type,
            voice_config,
            source_files: inner.sources.checked_files().map(str::to_string).collect(),
        };

        inner.job = Some(GenerationJob::new(job_id.clone(), generation_type));
        self.transition(inner, GenerationState::Requesting(generation_type));

        Ok(PreparedSubmission {
            job_id,
            generation_type,
            request,
            guard: self.begin_request(inner),
        })
    }

    /// Call the gateway for a prepared job and apply its answer
    async fn send_submission(
        &self,
        prepared: Result<PreparedSubmission<'_>, NotReadyReason>,
    ) -> GenerationResult<GenerateOutcome> {
        let PreparedSubmission {
            job_id,
            generation_type,
            request,
            guard,
        } = match prepared {
            Ok(prepared) => prepared,
            Err(reason) => return Ok(GenerateOutcome::NotReady(reason)),
        };

        info!(
            session_id = %self.session_id,
            job_id = %job_id,
            ?generation_type,
            sources = request.source_files.len(),
            "Submitting generation job"
        );

        let result = self
            .collaborators
            .gateway
            .confirm_create_content(&job_id, &request)
            .await;

        let outcome = {
            let mut inner = self.lock();
            if inner.closed {
                debug!(job_id = %job_id, "Submission finished after session closed; ignoring");
                return Err(GenerationError::SessionClosed);
            }
            let tracked = inner.is_tracking(&job_id);

            match result {
                Ok(()) => {
                    if tracked {
                        if let Some(job) = inner.job.as_mut() {
                            job.advance_to(JobStatus::Submitted);
                        }
                        // A terminal event may already have moved the state on
                        if inner.state == GenerationState::Requesting(generation_type) {
                            self.transition(
                                &mut inner,
                                GenerationState::InProgress(generation_type),
                            );
                        }
                    }
                    info!(session_id = %self.session_id, job_id = %job_id, "Generation job accepted");
                    self.emit(GenerationEvent::JobSubmitted {
                        session_id: self.session_id,
                        job_id: job_id.clone(),
                        generation_type,
                        timestamp: Utc::now(),
                    });
                    Ok(GenerateOutcome::Submitted { job_id })
                }
                Err(err) => {
                    warn!(
                        session_id = %self.session_id,
                        job_id = %job_id,
                        error = %err,
                        "Job submission failed"
                    );
                    if tracked && inner.job.as_ref().is_some_and(|job| !job.is_terminal()) {
                        inner.job = None;
                        if inner.state == GenerationState::Requesting(generation_type) {
                            self.transition(&mut inner, GenerationState::Empty);
                        }
                    }
                    inner.last_error = Some(err.to_string());
                    self.emit(GenerationEvent::SubmissionFailed {
                        session_id: self.session_id,
                        generation_type,
                        error: err.to_string(),
                        timestamp: Utc::now(),
                    });
                    Err(GenerationError::Submission(err))
                }
            }
        };
        drop(guard);
        outcome
    }

    /// Apply one progress event from the channel
    ///
    /// Events for other jobs and repeated or late deliveries leave state and
    /// notifications exactly as a single delivery would.
    pub fn on_job_progress(&self, event: JobProgressEvent) -> EventDisposition {
        let mut inner = self.lock();
        if inner.closed {
            debug!(job_id = %event.job_id, "Progress event after session closed; dropped");
            return EventDisposition::Dropped;
        }

        let decision = reconcile(inner.job.as_ref(), &event);
        let (job_id, generation_type) = match (&decision, inner.job.as_ref()) {
            (ProgressDecision::Ignore(reason), _) => {
                debug!(
                    session_id = %self.session_id,
                    job_id = %event.job_id,
                    status = %event.status,
                    ?reason,
                    "Progress event ignored"
                );
                return EventDisposition::Ignored(*reason);
            }
            (_, Some(job)) => (job.job_id.clone(), job.generation_type),
            (_, None) => return EventDisposition::Ignored(IgnoreReason::UnknownJob),
        };

        match decision {
            ProgressDecision::Ignore(reason) => EventDisposition::Ignored(reason),
            ProgressDecision::Progress(status) => {
                if let Some(job) = inner.job.as_mut() {
                    job.advance_to(status);
                }
                debug!(job_id = %job_id, %status, "Job progress");
                self.emit(GenerationEvent::JobProgress {
                    session_id: self.session_id,
                    job_id,
                    status,
                    timestamp: Utc::now(),
                });
                EventDisposition::Progressed(status)
            }
            ProgressDecision::Complete {
                blob_name,
                duration_seconds,
                actual_duration_seconds,
            } => {
                if let Some(job) = inner.job.as_mut() {
                    job.mark_completed(blob_name.clone(), actual_duration_seconds);
                }

                let content = StagedContent {
                    title: auto_title(generation_type, Utc::now()),
                    content_type: generation_type,
                    duration_seconds,
                    file_size_bytes: PLACEHOLDER_FILE_SIZE_BYTES,
                    blob_name,
                };
                info!(
                    session_id = %self.session_id,
                    job_id = %job_id,
                    title = %content.title,
                    duration_seconds,
                    "Generated content staged"
                );

                inner.staged = Some(content.clone());
                self.transition(&mut inner, GenerationState::Generated(generation_type));
                self.emit(GenerationEvent::ContentGenerated {
                    session_id: self.session_id,
                    job_id,
                    content,
                    timestamp: Utc::now(),
                });
                EventDisposition::Generated
            }
            ProgressDecision::Fail { reason } => {
                if let Some(job) = inner.job.as_mut() {
                    job.mark_failed(reason.clone());
                }
                warn!(
                    session_id = %self.session_id,
                    job_id = %job_id,
                    reason = %reason,
                    "Generation job failed"
                );

                inner.staged = None;
                inner.last_error = Some(reason.clone());
                self.transition(&mut inner, GenerationState::Empty);
                self.emit(GenerationEvent::GenerationFailed {
                    session_id: self.session_id,
                    job_id,
                    generation_type,
                    reason,
                    timestamp: Utc::now(),
                });
                EventDisposition::Failed
            }
        }
    }

    /// Save the staged content as a lesson material in `folder_id`
    ///
    /// Refused while loading, with nothing staged, or without a folder. On
    /// failure the content stays staged so the user can retry or discard.
    pub async fn persist_staged_content(
        &self,
        folder_id: Option<&str>,
    ) -> GenerationResult<PersistOutcome> {
        let (staged, folder_id, guard) = {
            let mut inner = self.lock();
            let ready = if inner.closed {
                Err(NotReadyReason::SessionClosed)
            } else if inner.is_loading() {
                Err(NotReadyReason::Loading)
            } else {
                match (inner.staged.clone(), folder_id) {
                    (None, _) => Err(NotReadyReason::NothingStaged),
                    (Some(_), None) => Err(NotReadyReason::NoDestinationFolder),
                    (Some(staged), Some(folder_id)) => Ok((staged, folder_id.to_string())),
                }
            };
            match ready {
                Ok((staged, folder_id)) => (staged, folder_id, self.begin_request(&mut inner)),
                Err(reason) => {
                    debug!(session_id = %self.session_id, ?reason, "Persist request not ready");
                    return Ok(PersistOutcome::NotReady(reason));
                }
            }
        };

        let source_url = self.persist(staged, folder_id, guard).await?;

        let mut inner = self.lock();
        if !inner.closed && inner.staged.is_none() {
            if let GenerationState::Generated(_) = inner.state {
                self.transition(&mut inner, GenerationState::Empty);
            }
        }
        Ok(PersistOutcome::Saved { source_url })
    }

    /// Persist `staged` and clear the slot on success; returns the source URL
    async fn persist(
        &self,
        staged: StagedContent,
        folder_id: String,
        guard: RequestGuard<'_>,
    ) -> GenerationResult<String> {
        let request = CreateLessonMaterialsRequest::for_staged(&staged, &folder_id);
        let source_url = staged.clean_blob_name().to_string();

        info!(
            session_id = %self.session_id,
            title = %staged.title,
            folder_id = %folder_id,
            source_url = %source_url,
            "Saving generated content"
        );

        let result = self.collaborators.materials.create(&request).await;

        let outcome = {
            let mut inner = self.lock();
            if inner.closed {
                debug!(title = %staged.title, "Save finished after session closed; ignoring");
                return Err(GenerationError::SessionClosed);
            }

            match result {
                Ok(()) => {
                    if inner.staged.as_ref() == Some(&staged) {
                        inner.staged = None;
                    }
                    self.emit(GenerationEvent::ContentSaved {
                        session_id: self.session_id,
                        title: staged.title.clone(),
                        folder_id,
                        source_url: source_url.clone(),
                        timestamp: Utc::now(),
                    });
                    Ok(source_url)
                }
                Err(err) => {
                    warn!(
                        session_id = %self.session_id,
                        title = %staged.title,
                        error = %err,
                        "Saving generated content failed; content kept"
                    );
                    inner.last_error = Some(err.to_string());
                    self.emit(GenerationEvent::PersistFailed {
                        session_id: self.session_id,
                        title: staged.title.clone(),
                        error: err.to_string(),
                        timestamp: Utc::now(),
                    });
                    Err(GenerationError::Persistence(err))
                }
            }
        };
        drop(guard);
        outcome
    }

    /// Drop the staged content without saving it; returns whether any existed
    pub fn discard_staged_content(&self) -> bool {
        let mut inner = self.lock();
        // Loading covers the overwrite prompt, whose answer acts on this slot
        if inner.closed || inner.is_loading() {
            return false;
        }
        self.discard_locked(&mut inner)
    }

    fn discard_locked(&self, inner: &mut SessionInner) -> bool {
        let Some(staged) = inner.staged.take() else {
            return false;
        };
        info!(
            session_id = %self.session_id,
            title = %staged.title,
            "Staged content discarded"
        );
        if let GenerationState::Generated(_) = inner.state {
            self.transition(inner, GenerationState::Empty);
        }
        self.emit(GenerationEvent::StagedContentDiscarded {
            session_id: self.session_id,
            content_type: staged.content_type,
            timestamp: Utc::now(),
        });
        true
    }

    /// Tear the session down
    ///
    /// Later progress events are dropped and completions of calls still in
    /// flight no longer touch session state.
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.closed {
            return;
        }
        inner.closed = true;
        inner.job = None;
        inner.staged = None;
        info!(session_id = %self.session_id, "Generation session closed");
        self.emit(GenerationEvent::SessionClosed {
            session_id: self.session_id,
            timestamp: Utc::now(),
        });
    }

    fn transition(&self, inner: &mut SessionInner, new_state: GenerationState) {
        let old_state = inner.state;
        if old_state == new_state {
            return;
        }
        inner.state = new_state;
        info!(
            session_id = %self.session_id,
            "State transition: {} → {}",
            old_state,
            new_state
        );
        self.emit(GenerationEvent::StateChanged {
            session_id: self.session_id,
            old_state,
            new_state,
            timestamp: Utc::now(),
        });
    }

    fn emit(&self, event: GenerationEvent) {
        self.event_bus.emit_lossy(event);
    }
}
