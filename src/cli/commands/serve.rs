//! HTTP API server.
//!
//! Exposes the voice and text query flows, service info, knowledge reload,
//! and the synthesized audio files.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::HarkError;
use crate::orchestrator::QueryOrchestrator;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

/// Multipart field carrying the recording.
const AUDIO_FIELD: &str = "audio";

/// Name used when the client sends no file name.
const DEFAULT_UPLOAD_NAME: &str = "recording.webm";

/// Shared application state.
pub struct AppState {
    orchestrator: QueryOrchestrator,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(orchestrator: QueryOrchestrator, request_timeout: Duration) -> Self {
        Self {
            orchestrator,
            request_timeout,
        }
    }
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    for issue in preflight::degradations(&settings, Operation::Serve) {
        Output::warning(&issue);
    }

    let orchestrator = QueryOrchestrator::new(&settings)?;
    let info = orchestrator.info();

    let state = Arc::new(AppState::new(
        orchestrator,
        Duration::from_secs(settings.server.request_timeout_secs),
    ));
    let app = router(
        state,
        settings.server.max_upload_bytes,
        &settings.server.audio_url_prefix,
    );

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    Output::header("Hark API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv(
        "Knowledge",
        &format!("{} pairs ({})", info.qa_pairs_loaded, info.knowledge_source),
    );
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Voice query", "POST /api/voice");
    Output::kv("Text query", "POST /api/text");
    Output::kv("Info", "GET  /api/info");
    Output::kv("Reload", "POST /api/reload");
    Output::kv("Audio", &format!("GET  {}/{{name}}", settings.server.audio_url_prefix));
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize, audio_url_prefix: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/api/voice", post(voice))
        .route("/api/text", post(text))
        .route("/api/info", get(service_info))
        .route("/api/reload", post(reload));

    let prefix = audio_url_prefix.trim_end_matches('/');
    if prefix.starts_with('/') && prefix.len() > 1 {
        app = app.route(&format!("{prefix}/{{name}}"), get(audio_file));
    } else {
        warn!(
            "Audio URL prefix {:?} is not a local path; artifacts are not served",
            audio_url_prefix
        );
    }

    app.layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct TextRequest {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceResponse {
    transcript: String,
    reply: String,
    audio_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TextResponse {
    reply: String,
    audio_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReloadResponse {
    qa_pairs_loaded: usize,
    generation: u64,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Error returned to HTTP clients. Only the public message is sent.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }

    fn payload_too_large() -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "payload too large".to_string(),
        }
    }

    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "not found".to_string(),
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal error".to_string(),
        }
    }
}

impl From<HarkError> for ApiError {
    fn from(err: HarkError) -> Self {
        match err {
            HarkError::InvalidInput(message) => Self::bad_request(&message),
            HarkError::ArtifactNotFound(name) => {
                debug!("Unknown artifact requested: {}", name);
                Self::not_found()
            }
            HarkError::Conversion(detail) => {
                warn!("Audio conversion failed: {}", detail);
                Self::bad_request("audio conversion failed")
            }
            other => {
                error!("Request failed: {}", other);
                Self::internal()
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::payload_too_large()
        } else {
            warn!("Malformed upload: {}", err);
            Self::bad_request("no audio provided")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Run `fut` under the request timeout.
async fn within<T>(
    timeout: Duration,
    fut: impl Future<Output = crate::Result<T>>,
) -> Result<T, ApiError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => {
            error!("Request exceeded {:?}", timeout);
            Err(ApiError::internal())
        }
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn voice(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<VoiceResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        warn!("Rejected upload: {}", e);
        ApiError::bad_request("no audio provided")
    })?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_UPLOAD_NAME)
            .to_string();
        let bytes = field.bytes().await?;
        upload = Some((bytes, file_name));
        break;
    }

    let Some((bytes, file_name)) = upload else {
        return Err(ApiError::bad_request("no audio provided"));
    };

    let response = within(
        state.request_timeout,
        state.orchestrator.voice_query(&bytes, &file_name),
    )
    .await?;

    Ok(Json(VoiceResponse {
        transcript: response.transcript.map(|t| t.text).unwrap_or_default(),
        reply: response.reply,
        audio_url: response.audio_url,
    }))
}

async fn text(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<TextResponse>, ApiError> {
    let Json(req) = body.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::payload_too_large()
        } else {
            warn!("Rejected text body: {}", e);
            ApiError::bad_request("no text provided")
        }
    })?;

    let response = within(state.request_timeout, state.orchestrator.text_query(&req.text)).await?;

    Ok(Json(TextResponse {
        reply: response.reply,
        audio_url: response.audio_url,
    }))
}

async fn audio_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let path = state.orchestrator.artifacts().output_path(&name)?;
    let bytes = tokio::fs::read(&path).await.map_err(HarkError::from)?;

    Ok(([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response())
}

async fn service_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.orchestrator.info())
}

async fn reload(State(state): State<Arc<AppState>>) -> Result<Json<ReloadResponse>, ApiError> {
    let snapshot = state.orchestrator.reload_knowledge().await?;
    info!(
        "Reloaded {} pairs (generation {})",
        snapshot.len(),
        snapshot.generation()
    );

    Ok(Json(ReloadResponse {
        qa_pairs_loaded: snapshot.len(),
        generation: snapshot.generation(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dir_len, orchestrator, wav_bytes, FixedTranscriber, SlowTranscriber};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const BOUNDARY: &str = "hark-test-boundary";
    const LIMIT: usize = 16 * 1024 * 1024;

    struct TestApp {
        dir: tempfile::TempDir,
        upload_dir: std::path::PathBuf,
        app: Router,
    }

    fn app_with(transcriber: Arc<dyn crate::transcription::Transcriber>, limit: usize, timeout: Duration) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(dir.path(), transcriber);
        let upload_dir = orchestrator.artifacts().upload_dir().to_path_buf();
        let state = Arc::new(AppState::new(orchestrator, timeout));
        TestApp {
            dir,
            upload_dir,
            app: router(state, limit, "/static/tts"),
        }
    }

    fn app() -> TestApp {
        app_with(
            Arc::new(FixedTranscriber(Ok("hello how r u"))),
            LIMIT,
            Duration::from_secs(30),
        )
    }

    fn multipart_body(field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn voice_request(body: Vec<u8>) -> Request<Body> {
        Request::post("/api/voice")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn text_request(json: serde_json::Value) -> Request<Body> {
        Request::post("/api/text")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let t = app();
        let (status, body) = send(&t.app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_text_query_and_audio_download() {
        let t = app();
        let (status, body) = send(&t.app, text_request(serde_json::json!({ "text": "Tell me a joke" }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["reply"],
            "Why don't scientists trust atoms? Because they make up everything!"
        );
        let audio_url = body["audioUrl"].as_str().unwrap().to_string();
        assert!(audio_url.starts_with("/static/tts/tts_"));

        let response = t
            .app
            .clone()
            .oneshot(Request::get(audio_url.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.starts_with(b"RIFF"));
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected() {
        let t = app();
        for json in [serde_json::json!({ "text": "   " }), serde_json::json!({})] {
            let (status, body) = send(&t.app, text_request(json)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "no text provided");
        }
    }

    #[tokio::test]
    async fn test_voice_query() {
        let t = app();
        let (status, body) = send(&t.app, voice_request(multipart_body("audio", "clip.wav", &wav_bytes()))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transcript"], "hello how r u");
        assert_eq!(
            body["reply"],
            "I am doing well, thank you for asking! How can I help you today?"
        );
        assert!(body["audioUrl"].as_str().unwrap().starts_with("/static/tts/"));
        assert_eq!(dir_len(&t.upload_dir), 0);
    }

    #[tokio::test]
    async fn test_voice_without_audio_field() {
        let t = app();
        let (status, body) = send(&t.app, voice_request(multipart_body("file", "clip.wav", &wav_bytes()))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "no audio provided");

        let (status, body) = send(&t.app, voice_request(multipart_body("audio", "clip.wav", b""))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "no audio provided");
    }

    #[tokio::test]
    async fn test_voice_with_corrupt_audio() {
        let t = app();
        let (status, body) = send(&t.app, voice_request(multipart_body("audio", "clip.webm", b"not audio at all"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "audio conversion failed");
        assert_eq!(dir_len(&t.upload_dir), 0);
    }

    #[tokio::test]
    async fn test_oversized_upload() {
        let t = app_with(
            Arc::new(FixedTranscriber(Ok("hello"))),
            1024,
            Duration::from_secs(30),
        );
        let (status, body) = send(&t.app, voice_request(multipart_body("audio", "big.wav", &vec![0u8; 8192]))).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "payload too large");
    }

    #[tokio::test]
    async fn test_timeout_is_internal_error_and_cleans_up() {
        let t = app_with(
            Arc::new(SlowTranscriber(Duration::from_secs(10))),
            LIMIT,
            Duration::from_millis(50),
        );
        let (status, body) = send(&t.app, voice_request(multipart_body("audio", "clip.wav", &wav_bytes()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal error");
        assert_eq!(dir_len(&t.upload_dir), 0);
    }

    #[tokio::test]
    async fn test_info_and_reload() {
        let t = app();
        let (status, body) = send(&t.app, Request::get("/api/info").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "running");
        assert_eq!(body["qaPairsLoaded"], 6);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["generation"], 1);
        assert!(body.get("knowledgeSource").is_none());

        let (status, body) = send(&t.app, Request::post("/api/reload").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["qaPairsLoaded"], 6);
        assert_eq!(body["generation"], 2);
    }

    #[tokio::test]
    async fn test_unknown_artifact_is_not_found() {
        let t = app();
        let response = t
            .app
            .clone()
            .oneshot(Request::get("/static/tts/tts_missing.wav").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_artifact_names_cannot_escape_output_dir() {
        let t = app();
        std::fs::write(t.dir.path().join("secret.txt"), b"secret").unwrap();

        for uri in ["/static/tts/..", "/static/tts/..%2Fsecret.txt", "/static/tts/tts%2F..%2F..%2Fsecret.txt"] {
            let (status, body) = send(&t.app, Request::get(uri).body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].as_str().unwrap().starts_with("invalid artifact name"));
        }
    }
}
