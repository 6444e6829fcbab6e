//! Test Helper Utilities
//!
//! In-memory collaborators and builders shared by the lessongen-ai
//! integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use lessongen_ai::collaborators::{
    Collaborators, ConfirmContentRequest, CreateLessonMaterialsRequest, JobSubmissionGateway,
    LessonMaterialApi, OverwriteConfirmer, OverwriteDecision,
};
use lessongen_ai::error::ApiError;
use lessongen_ai::models::{JobProgressEvent, SourceItem, SourceKind};
use lessongen_ai::services::{GenerationOrchestrator, GenerationSettingsStore};
use lessongen_common::events::{
    EventBus, GenerationEvent, GenerationType, JobStatus, StagedContent,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, Notify};

pub const TEST_FOLDER: &str = "folder-1";

// ============================================================================
// Fake collaborators
// ============================================================================

/// Job gateway that records every submission
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<(String, ConfirmContentRequest)>>,
    failure: Mutex<Option<ApiError>>,
    gate: Option<Arc<Notify>>,
}

impl RecordingGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Gateway whose calls stay pending until `gate` is notified
    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            gate: Some(gate),
            ..Self::default()
        })
    }

    pub fn fail_with(&self, error: ApiError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn succeed(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<(String, ConfirmContentRequest)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl JobSubmissionGateway for RecordingGateway {
    async fn confirm_create_content(
        &self,
        job_id: &str,
        request: &ConfirmContentRequest,
    ) -> Result<(), ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push((job_id.to_string(), request.clone()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Lesson material API that records every create call
#[derive(Default)]
pub struct RecordingMaterialApi {
    calls: Mutex<Vec<CreateLessonMaterialsRequest>>,
    failure: Mutex<Option<ApiError>>,
    gate: Option<Arc<Notify>>,
}

impl RecordingMaterialApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            gate: Some(gate),
            ..Self::default()
        })
    }

    pub fn fail_with(&self, error: ApiError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn succeed(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<CreateLessonMaterialsRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LessonMaterialApi for RecordingMaterialApi {
    async fn create(&self, request: &CreateLessonMaterialsRequest) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Overwrite prompt answering from a script (Dismiss once the script runs out)
#[derive(Default)]
pub struct ScriptedConfirmer {
    answers: Mutex<VecDeque<OverwriteDecision>>,
    prompts: Mutex<Vec<(GenerationType, GenerationType)>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedConfirmer {
    pub fn answering(answers: impl IntoIterator<Item = OverwriteDecision>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into_iter().collect()),
            ..Self::default()
        })
    }

    /// Confirmer that waits for `gate` before answering
    pub fn gated(
        answers: impl IntoIterator<Item = OverwriteDecision>,
        gate: Arc<Notify>,
    ) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into_iter().collect()),
            gate: Some(gate),
            ..Self::default()
        })
    }

    /// (staged type, requested type) of every prompt shown
    pub fn prompts(&self) -> Vec<(GenerationType, GenerationType)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl OverwriteConfirmer for ScriptedConfirmer {
    async fn confirm_overwrite(
        &self,
        staged: &StagedContent,
        target: GenerationType,
    ) -> OverwriteDecision {
        self.prompts
            .lock()
            .unwrap()
            .push((staged.content_type, target));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(OverwriteDecision::Dismiss)
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Fakes wired into one orchestrator
pub struct Harness {
    pub orchestrator: Arc<GenerationOrchestrator>,
    pub gateway: Arc<RecordingGateway>,
    pub materials: Arc<RecordingMaterialApi>,
    pub confirmer: Arc<ScriptedConfirmer>,
}

impl Harness {
    /// Orchestrator with complete settings and one checked, uploaded source
    pub fn ready() -> Self {
        Self::with(
            RecordingGateway::new(),
            RecordingMaterialApi::new(),
            ScriptedConfirmer::answering([]),
        )
    }

    pub fn with(
        gateway: Arc<RecordingGateway>,
        materials: Arc<RecordingMaterialApi>,
        confirmer: Arc<ScriptedConfirmer>,
    ) -> Self {
        let harness = Self::unconfigured(gateway, materials, confirmer);
        harness.orchestrator.edit_settings(|settings| {
            settings.set_voice(Some("vi-VN-Standard-A".to_string()));
            settings.set_language(Some("vi-VN".to_string()));
            settings.set_speaking_rate(Some(1.0));
            settings.set_destination_folder_id(Some(TEST_FOLDER.to_string()));
        });
        harness.orchestrator.edit_sources(|sources| {
            sources.add_source(
                SourceItem::new("s1", "lesson.pdf", SourceKind::Pdf)
                    .with_file_ref("uploads/lesson.pdf")
                    .checked(true),
            )
        });
        harness
    }

    /// Orchestrator with empty settings and no sources
    pub fn unconfigured(
        gateway: Arc<RecordingGateway>,
        materials: Arc<RecordingMaterialApi>,
        confirmer: Arc<ScriptedConfirmer>,
    ) -> Self {
        let collaborators = Collaborators {
            gateway: gateway.clone(),
            materials: materials.clone(),
            confirmer: confirmer.clone(),
        };
        let orchestrator = Arc::new(GenerationOrchestrator::with_settings(
            collaborators,
            EventBus::new(100),
            GenerationSettingsStore::new(),
        ));
        Self {
            orchestrator,
            gateway,
            materials,
            confirmer,
        }
    }

    /// Job id of the most recent submission
    pub fn last_job_id(&self) -> String {
        self.gateway
            .calls()
            .last()
            .map(|(job_id, _)| job_id.clone())
            .expect("a job should have been submitted")
    }
}

// ============================================================================
// Events
// ============================================================================

pub fn progress(job_id: &str, status: JobStatus) -> JobProgressEvent {
    JobProgressEvent::new(job_id, status)
}

pub fn completed(
    job_id: &str,
    generation_type: GenerationType,
    blob: &str,
    duration: f64,
) -> JobProgressEvent {
    let mut event = JobProgressEvent::new(job_id, JobStatus::Completed);
    match generation_type {
        GenerationType::Audio => event.audio_output_blob_name_url = Some(blob.to_string()),
        GenerationType::Video => event.video_output_blob_name_url = Some(blob.to_string()),
    }
    event.actual_duration_seconds = Some(duration);
    event
}

pub fn failed(job_id: &str, reason: &str) -> JobProgressEvent {
    let mut event = JobProgressEvent::new(job_id, JobStatus::Failed);
    event.failure_reason = Some(reason.to_string());
    event
}

/// Every notification received so far (non-blocking)
pub fn drain(rx: &mut broadcast::Receiver<GenerationEvent>) -> Vec<GenerationEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Event type names of `events`, in order
pub fn event_types(events: &[GenerationEvent]) -> Vec<String> {
    events.iter().map(|e| e.event_type().to_string()).collect()
}

/// Yield until `condition` holds (bounded)
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
