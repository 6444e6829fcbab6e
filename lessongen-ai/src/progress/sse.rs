//! Server-sent event progress channel
//!
//! Reads `text/event-stream` from the backend's progress endpoint. Each
//! event's `data:` payload is one JSON `JobProgressEvent`; comments
//! (heartbeats) and payloads that fail to parse are skipped.

use super::JobProgressChannel;
use crate::error::ApiError;
use crate::models::JobProgressEvent;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Incremental `text/event-stream` parser
///
/// Bytes are buffered until a full line is present, so a UTF-8 sequence
/// split across network chunks is never decoded in halves.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the data payloads of every completed event
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);

            if line.is_empty() {
                if !self.data.is_empty() {
                    payloads.push(self.data.join("\n"));
                    self.data.clear();
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (&*line, ""),
            };
            // `event`, `id` and `retry` carry nothing the session needs
            if field == "data" {
                self.data.push(value.to_string());
            }
        }
        payloads
    }
}

/// Parse one event payload; `None` (logged) when it is not a progress event
pub fn parse_progress_event(payload: &str) -> Option<JobProgressEvent> {
    match serde_json::from_str::<JobProgressEvent>(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Skipping unparseable progress event: {} ({})", e, payload);
            None
        }
    }
}

/// Progress channel backed by an SSE response body
pub struct SseProgressChannel {
    url: String,
    stream: BoxStream<'static, Result<Vec<u8>, ApiError>>,
    decoder: SseDecoder,
    pending: VecDeque<JobProgressEvent>,
}

impl SseProgressChannel {
    /// Open the event stream at `url`
    ///
    /// Uses a client without a request timeout: the stream stays open for
    /// the whole session.
    pub async fn connect(url: impl Into<String>) -> Result<Self, ApiError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        let response = client
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        info!("Connected to progress stream {}", url);

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ApiError::from))
            .boxed();

        Ok(Self {
            url,
            stream,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl JobProgressChannel for SseProgressChannel {
    async fn recv(&mut self) -> Option<JobProgressEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => {
                    let events = self
                        .decoder
                        .push(&chunk)
                        .iter()
                        .filter_map(|payload| parse_progress_event(payload))
                        .collect::<Vec<_>>();
                    self.pending.extend(events);
                }
                Some(Err(e)) => {
                    warn!("Progress stream {} failed: {}", self.url, e);
                    return None;
                }
                None => {
                    debug!("Progress stream {} ended", self.url);
                    return None;
                }
            }
        }
    }
}
