//! HTTP chat server.
//!
//! Serves the chat shell as a JSON API so several users can chat at once,
//! each with their own transcript.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `PUT`    | `/documents/{filename}` | Upload a PDF (raw body) and index it |
//! | `POST`   | `/reset` | Clear the vector store |
//! | `POST`   | `/sessions` | Start a session; returns its id and welcome transcript |
//! | `GET`    | `/sessions/{id}/messages` | Session transcript |
//! | `POST`   | `/sessions/{id}/messages` | Ask a question: `{ "content": "..." }` |
//! | `DELETE` | `/sessions/{id}` | End a session |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "generation_failed", "message": "Sorry, ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `payload_too_large`
//! (413), `extraction_failed` (422), `embedding_failed` (502),
//! `generation_failed` (502), `internal` (500).
//!
//! A failed question leaves the user turn in the transcript and adds no
//! assistant turn.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front-end
//! can be served from anywhere.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use ragify_core::models::{ChatMessage, ScoredChunk};

use crate::config::Config;
use crate::error::{AnswerError, IndexError, UploadError, UploadFlowError};
use crate::ingest::IndexReport;
use crate::session::{SessionHandle, SessionRegistry};
use crate::shell::ChatShell;

#[derive(Clone)]
struct AppState {
    shell: Arc<ChatShell>,
    sessions: Arc<SessionRegistry>,
}

/// Build the router around an existing shell.
pub fn router(shell: Arc<ChatShell>) -> Router {
    // Leave headroom above the upload cap so oversized files reach the
    // handler and get a JSON error instead of a bare 413.
    let body_limit = shell.uploads().max_bytes().saturating_add(1024 * 1024);

    let state = AppState {
        shell,
        sessions: Arc::new(SessionRegistry::new()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/documents/{filename}", put(handle_upload))
        .route("/reset", post(handle_reset))
        .route("/sessions", post(handle_create_session))
        .route(
            "/sessions/{id}/messages",
            get(handle_get_messages).post(handle_post_message),
        )
        .route("/sessions/{id}", axum::routing::delete(handle_delete_session))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Serve on an already-bound listener until the process stops.
pub async fn serve(listener: tokio::net::TcpListener, shell: Arc<ChatShell>) -> anyhow::Result<()> {
    axum::serve(listener, router(shell)).await?;
    Ok(())
}

/// Start the server on `[server].bind` with providers from `config`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let shell = Arc::new(ChatShell::from_config(config).await?);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("ragify listening on http://{}", listener.local_addr()?);
    tracing::info!(bind = %config.server.bind, "server started");
    serve(listener, shell).await
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::NOT_FOUND, "not_found", message)
}

fn internal(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

impl From<UploadFlowError> for AppError {
    fn from(err: UploadFlowError) -> Self {
        let message = err.to_string();
        match err {
            UploadFlowError::Upload(UploadError::InvalidFilename(_))
            | UploadFlowError::Upload(UploadError::UnsupportedType(_)) => bad_request(message),
            UploadFlowError::Upload(UploadError::TooLarge { .. }) => {
                AppError::new(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", message)
            }
            UploadFlowError::Upload(UploadError::Io(_)) => internal(message),
            UploadFlowError::Index(IndexError::Extraction(_)) => {
                AppError::new(StatusCode::UNPROCESSABLE_ENTITY, "extraction_failed", message)
            }
            UploadFlowError::Index(IndexError::Embedding { .. }) => {
                AppError::new(StatusCode::BAD_GATEWAY, "embedding_failed", message)
            }
            UploadFlowError::Index(IndexError::Store { .. }) => internal(message),
        }
    }
}

impl From<AnswerError> for AppError {
    fn from(err: AnswerError) -> Self {
        let code = match err {
            AnswerError::Embedding(_) => "embedding_failed",
            AnswerError::Store(_) => "internal",
            AnswerError::Generation(_) => "generation_failed",
        };
        let status = match err {
            AnswerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };
        AppError::new(status, code, ChatShell::apology(&err))
    }
}

fn parse_session_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| bad_request(format!("invalid session id: {}", raw)))
}

async fn lookup(state: &AppState, raw: &str) -> Result<SessionHandle, AppError> {
    let id = parse_session_id(raw)?;
    state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| not_found(format!("no session with id: {}", id)))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ PUT /documents/{filename} ============

async fn handle_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    body: Bytes,
) -> Result<Json<IndexReport>, AppError> {
    if body.is_empty() {
        return Err(bad_request("upload body must not be empty"));
    }
    match state.shell.upload(&filename, &body).await {
        Ok(report) => Ok(Json(report)),
        Err(err) => {
            tracing::warn!(file = %filename, error = %err, "upload failed");
            Err(err.into())
        }
    }
}

// ============ POST /reset ============

#[derive(Serialize)]
struct ResetResponse {
    status: &'static str,
}

async fn handle_reset(State(state): State<AppState>) -> Result<Json<ResetResponse>, AppError> {
    state
        .shell
        .reset()
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(ResetResponse { status: "cleared" }))
}

// ============ Sessions ============

#[derive(Serialize)]
struct SessionResponse {
    id: Uuid,
    messages: Vec<ChatMessage>,
}

async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let transcript = state.shell.new_transcript();
    let messages = transcript.messages().to_vec();
    let (id, _) = state.sessions.create(transcript).await;
    (StatusCode::CREATED, Json(SessionResponse { id, messages }))
}

#[derive(Serialize)]
struct MessagesResponse {
    messages: Vec<ChatMessage>,
}

async fn handle_get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessagesResponse>, AppError> {
    let session = lookup(&state, &id).await?;
    let transcript = session.lock().await;
    Ok(Json(MessagesResponse {
        messages: transcript.messages().to_vec(),
    }))
}

#[derive(Deserialize)]
struct AskRequest {
    content: String,
}

#[derive(Serialize)]
struct AskResponse {
    message: ChatMessage,
    sources: Vec<ScoredChunk>,
    grounded: bool,
}

async fn handle_post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(request) = request.map_err(|e| bad_request(e.body_text()))?;
    let content = request.content.trim();
    if content.is_empty() {
        return Err(bad_request("content must not be empty"));
    }
    let session = lookup(&state, &id).await?;
    let mut transcript = session.lock().await;

    let answer = state.shell.ask(&mut transcript, content).await?;
    Ok(Json(AskResponse {
        message: ChatMessage::assistant(answer.text),
        sources: answer.sources,
        grounded: answer.grounded,
    }))
}

async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_session_id(&id)?;
    if state.sessions.remove(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(format!("no session with id: {}", id)))
    }
}
