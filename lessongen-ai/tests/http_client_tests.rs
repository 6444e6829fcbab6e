//! Integration tests for the REST collaborators and the SSE progress channel
//!
//! Each test binds a small axum server to an ephemeral local port.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream;
use lessongen_ai::collaborators::{
    ConfirmContentRequest, CreateLessonMaterialsRequest, JobSubmissionGateway, LessonApiClient,
    LessonMaterialApi,
};
use lessongen_ai::error::ApiError;
use lessongen_ai::models::VoiceConfig;
use lessongen_ai::progress::{JobProgressChannel, SseProgressChannel};
use lessongen_common::events::{GenerationType, JobStatus, StagedContent};
use serde_json::Value;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Recorded = Arc<Mutex<Vec<(String, Value)>>>;

/// Serve `app` on 127.0.0.1 and return its base URL
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    format!("http://{}", addr)
}

async fn record_confirm(
    State(recorded): State<Recorded>,
    Path(job_id): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    recorded.lock().unwrap().push((job_id, body));
    StatusCode::OK
}

async fn record_materials(State(recorded): State<Recorded>, Json(body): Json<Value>) -> StatusCode {
    recorded
        .lock()
        .unwrap()
        .push(("materials".to_string(), body));
    StatusCode::CREATED
}

fn recording_api(recorded: Recorded) -> Router {
    Router::new()
        .route("/api/lesson-contents/:job_id/confirm", post(record_confirm))
        .route("/api/lesson-materials", post(record_materials))
        .with_state(recorded)
}

fn voice() -> VoiceConfig {
    VoiceConfig {
        language_code: "vi-VN".to_string(),
        name: "vi-VN-Wavenet-B".to_string(),
        speaking_rate: 1.5,
    }
}

#[tokio::test]
async fn test_confirm_create_content_posts_json() {
    let recorded = Recorded::default();
    let base = serve(recording_api(recorded.clone())).await;
    let client = LessonApiClient::new(format!("{}/api", base), Duration::from_secs(5))
        .expect("client should build");

    let request = ConfirmContentRequest {
        generation_type: GenerationType::Audio,
        voice_config: voice(),
        source_files: vec!["uploads/a.pdf".to_string()],
    };
    client
        .confirm_create_content("job-42", &request)
        .await
        .expect("confirm should succeed");

    let calls = recorded.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    let (job_id, body) = &calls[0];
    assert_eq!(job_id, "job-42");
    assert_eq!(body["type"], "Audio");
    assert_eq!(body["voiceConfig"]["language_code"], "vi-VN");
    assert_eq!(body["voiceConfig"]["name"], "vi-VN-Wavenet-B");
    assert_eq!(body["voiceConfig"]["speaking_rate"], 1.5);
    assert_eq!(body["sourceFiles"], serde_json::json!(["uploads/a.pdf"]));
}

#[tokio::test]
async fn test_create_materials_posts_clean_blob_name() {
    let recorded = Recorded::default();
    let base = serve(recording_api(recorded.clone())).await;
    let client = LessonApiClient::new(format!("{}/api/", base), Duration::from_secs(5))
        .expect("client should build");

    let staged = StagedContent {
        title: "Video AI tạo_20260101120000".to_string(),
        content_type: GenerationType::Video,
        duration_seconds: 61,
        file_size_bytes: 1,
        blob_name: "videos/out.mp4?sv=2024&sig=xyz".to_string(),
    };
    client
        .create(&CreateLessonMaterialsRequest::for_staged(&staged, "folder-7"))
        .await
        .expect("create should succeed");

    let calls = recorded.lock().unwrap().clone();
    let (_, body) = &calls[0];
    assert_eq!(body["folderId"], "folder-7");
    assert_eq!(body["blobNames"], serde_json::json!(["videos/out.mp4"]));
    assert_eq!(body["lessonMaterials"][0]["sourceUrl"], "videos/out.mp4");
    assert_eq!(body["lessonMaterials"][0]["contentType"], "Video");
    assert_eq!(body["lessonMaterials"][0]["title"], "Video AI tạo_20260101120000");
    assert_eq!(body["lessonMaterials"][0]["isAIContent"], true);
}

#[tokio::test]
async fn test_non_success_status_is_rejected() {
    let app = Router::new().route(
        "/api/lesson-materials",
        post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "folder not found") }),
    );
    let base = serve(app).await;
    let client = LessonApiClient::new(format!("{}/api", base), Duration::from_secs(5))
        .expect("client should build");

    let request = CreateLessonMaterialsRequest {
        folder_id: "missing".to_string(),
        blob_names: vec!["b".to_string()],
        lesson_materials: Vec::new(),
    };
    let err = client.create(&request).await.expect_err("422 should be an error");
    assert_eq!(
        err,
        ApiError::Rejected {
            status: 422,
            message: "folder not found".to_string()
        }
    );
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local address");
    drop(listener);

    let client = LessonApiClient::new(format!("http://{}/api", addr), Duration::from_secs(2))
        .expect("client should build");
    let request = ConfirmContentRequest {
        generation_type: GenerationType::Video,
        voice_config: voice(),
        source_files: Vec::new(),
    };
    let err = client
        .confirm_create_content("job-1", &request)
        .await
        .expect_err("connection should fail");
    assert!(matches!(err, ApiError::Transport(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_sse_channel_yields_progress_events() {
    let app = Router::new().route(
        "/events",
        get(|| async {
            let events = vec![
                Ok::<_, Infallible>(Event::default().comment("heartbeat")),
                Ok(Event::default().data(r#"{"jobId":"j1","status":"Submitted"}"#)),
                Ok(Event::default().data("not json")),
                Ok(Event::default().event("progress").data(
                    r#"{"jobId":"j1","status":"Completed","audioOutputBlobNameUrl":"blob1?sig=abc","actualDurationSeconds":42.7}"#,
                )),
            ];
            Sse::new(stream::iter(events))
        }),
    );
    let base = serve(app).await;

    let mut channel = SseProgressChannel::connect(format!("{}/events", base))
        .await
        .expect("stream should connect");

    let first = channel.recv().await.expect("first event");
    assert_eq!(first.job_id, "j1");
    assert_eq!(first.status, JobStatus::Submitted);

    let second = channel.recv().await.expect("invalid payload skipped");
    assert_eq!(second.status, JobStatus::Completed);
    assert_eq!(second.audio_output_blob_name_url.as_deref(), Some("blob1?sig=abc"));
    assert_eq!(second.actual_duration_seconds, Some(42.7));

    assert!(channel.recv().await.is_none(), "stream ended");
}

#[tokio::test]
async fn test_sse_connect_rejected() {
    let app = Router::new().route("/events", get(|| async { StatusCode::NOT_FOUND }));
    let base = serve(app).await;

    let result = SseProgressChannel::connect(format!("{}/events", base)).await;
    assert!(matches!(result, Err(ApiError::Rejected { status: 404, .. })));
}
