//! REST implementations of the job gateway and the lesson material API

use super::{
    ConfirmContentRequest, CreateLessonMaterialsRequest, JobSubmissionGateway, LessonMaterialApi,
};
use crate::error::ApiError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest server error body kept in an `ApiError::Rejected` message
const MAX_ERROR_BODY_CHARS: usize = 512;

/// JSON client for the lesson content REST API
#[derive(Debug, Clone)]
pub struct LessonApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl LessonApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn confirm_url(&self, job_id: &str) -> String {
        format!("{}/lesson-contents/{}/confirm", self.base_url, job_id)
    }

    fn materials_url(&self) -> String {
        format!("{}/lesson-materials", self.base_url)
    }

    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<(), ApiError> {
        let response = self.client.post(url).json(body).send().await?;

        let status = response.status();
        if status.is_success() {
            debug!("POST {} → {}", url, status);
            return Ok(());
        }

        let message = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        warn!("POST {} rejected: {} {}", url, status, message);

        Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl JobSubmissionGateway for LessonApiClient {
    async fn confirm_create_content(
        &self,
        job_id: &str,
        request: &ConfirmContentRequest,
    ) -> Result<(), ApiError> {
        self.post_json(&self.confirm_url(job_id), request).await
    }
}

#[async_trait]
impl LessonMaterialApi for LessonApiClient {
    async fn create(&self, request: &CreateLessonMaterialsRequest) -> Result<(), ApiError> {
        self.post_json(&self.materials_url(), request).await
    }
}
