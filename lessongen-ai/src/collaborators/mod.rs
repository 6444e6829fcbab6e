//! External collaborators of the generation orchestrator
//!
//! The orchestrator only sees these traits; `http` holds the REST
//! implementations and tests plug in-memory fakes.

use crate::error::ApiError;
use crate::models::VoiceConfig;
use async_trait::async_trait;
use lessongen_common::events::{GenerationType, StagedContent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod http;

pub use http::LessonApiClient;

/// Body of a job confirmation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmContentRequest {
    #[serde(rename = "type")]
    pub generation_type: GenerationType,
    pub voice_config: VoiceConfig,
    /// File references of the selected sources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_files: Vec<String>,
}

/// One lesson material to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonMaterialDraft {
    pub title: String,
    pub content_type: GenerationType,
    pub duration: u64,
    pub file_size: u64,
    #[serde(rename = "isAIContent")]
    pub is_ai_content: bool,
    pub source_url: String,
}

/// Body of a lesson material creation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLessonMaterialsRequest {
    pub folder_id: String,
    pub blob_names: Vec<String>,
    pub lesson_materials: Vec<LessonMaterialDraft>,
}

impl CreateLessonMaterialsRequest {
    /// Request persisting one staged content item into `folder_id`
    ///
    /// The blob name loses any `?signature` suffix before it is used as the
    /// material's source URL.
    pub fn for_staged(staged: &StagedContent, folder_id: &str) -> Self {
        let clean_blob_name = staged.clean_blob_name().to_string();
        Self {
            folder_id: folder_id.to_string(),
            blob_names: vec![clean_blob_name.clone()],
            lesson_materials: vec![LessonMaterialDraft {
                title: staged.title.clone(),
                content_type: staged.content_type,
                duration: staged.duration_seconds,
                file_size: staged.file_size_bytes,
                is_ai_content: true,
                source_url: clean_blob_name,
            }],
        }
    }
}

/// Request/response API that confirms generation jobs
#[async_trait]
pub trait JobSubmissionGateway: Send + Sync {
    async fn confirm_create_content(
        &self,
        job_id: &str,
        request: &ConfirmContentRequest,
    ) -> Result<(), ApiError>;
}

/// Lesson material store that receives persisted content
#[async_trait]
pub trait LessonMaterialApi: Send + Sync {
    async fn create(&self, request: &CreateLessonMaterialsRequest) -> Result<(), ApiError>;
}

/// User's answer to the overwrite prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverwriteDecision {
    /// Persist the staged content, then generate the new type
    SaveFirst,
    /// Drop the staged content, then generate the new type
    Discard,
    /// Prompt closed without a choice; nothing changes
    Dismiss,
}

/// Prompt shown before staged content of one type is replaced by another
#[async_trait]
pub trait OverwriteConfirmer: Send + Sync {
    async fn confirm_overwrite(
        &self,
        staged: &StagedContent,
        target: GenerationType,
    ) -> OverwriteDecision;
}

/// Confirmer that always answers the same way (non-interactive callers)
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub OverwriteDecision);

#[async_trait]
impl OverwriteConfirmer for FixedDecision {
    async fn confirm_overwrite(
        &self,
        _staged: &StagedContent,
        _target: GenerationType,
    ) -> OverwriteDecision {
        self.0
    }
}

/// Handles to every collaborator of one generation session
#[derive(Clone)]
pub struct Collaborators {
    pub gateway: Arc<dyn JobSubmissionGateway>,
    pub materials: Arc<dyn LessonMaterialApi>,
    pub confirmer: Arc<dyn OverwriteConfirmer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_request_cleans_blob_name() {
        let staged = StagedContent {
            title: "Audio AI tạo_20260101000000".to_string(),
            content_type: GenerationType::Audio,
            duration_seconds: 43,
            file_size_bytes: 1,
            blob_name: "blob1?sig=abc&se=2026".to_string(),
        };
        let request = CreateLessonMaterialsRequest::for_staged(&staged, "folder-9");

        let json = serde_json::to_value(&request).expect("request should serialize");
        assert_eq!(json["folderId"], "folder-9");
        assert_eq!(json["blobNames"], serde_json::json!(["blob1"]));
        let material = &json["lessonMaterials"][0];
        assert_eq!(material["title"], "Audio AI tạo_20260101000000");
        assert_eq!(material["contentType"], "Audio");
        assert_eq!(material["duration"], 43);
        assert_eq!(material["fileSize"], 1);
        assert_eq!(material["isAIContent"], true);
        assert_eq!(material["sourceUrl"], "blob1");
    }

    #[test]
    fn test_confirm_request_wire_shape() {
        let request = ConfirmContentRequest {
            generation_type: GenerationType::Video,
            voice_config: VoiceConfig {
                language_code: "vi-VN".to_string(),
                name: "vi-VN-Standard-A".to_string(),
                speaking_rate: 1.0,
            },
            source_files: Vec::new(),
        };
        let json = serde_json::to_value(&request).expect("request should serialize");
        assert_eq!(json["type"], "Video");
        assert_eq!(json["voiceConfig"]["language_code"], "vi-VN");
        assert!(json.get("sourceFiles").is_none(), "empty source list is omitted");
    }
}
