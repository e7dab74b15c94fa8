//! Route handler functions for all API endpoints.
//!
//! Handlers stay thin: they validate input, call the conversation controller
//! and shape its results into JSON.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::info;

use ocrchat_chat::{ArchivedChat, OcrOutcome, Session, TurnOutcome, TurnState};
use ocrchat_core::types::Message;
use ocrchat_ocr::validate_upload;

use crate::error::ApiError;
use crate::state::AppState;

/// Longest archived-chat preview, in characters.
const PREVIEW_CHARS: usize = 60;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SessionNameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct MemoryRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Target session; defaults to the current one.
    pub session: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OcrParams {
    pub filename: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub inference_mode: String,
    pub model: String,
    pub ocr_engine: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub name: String,
    pub message_count: usize,
    pub has_memory: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionsResponse {
    pub current: String,
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    /// False when the name was blank or already taken.
    pub created: bool,
    pub current: String,
}

/// Everything the chat page needs to render one session.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub name: String,
    pub messages: Vec<Message>,
    pub memory_text: Option<String>,
    pub state: String,
}

impl SessionView {
    fn from_session(session: &Session) -> Self {
        let state = match session.state() {
            TurnState::Idle => "idle",
            TurnState::AwaitingReply => "awaiting_reply",
        };
        Self {
            name: session.name().to_string(),
            messages: session.messages().to_vec(),
            memory_text: session.memory_text().map(str::to_string),
            state: state.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session: String,
    pub reply: String,
    pub stored: bool,
}

impl From<TurnOutcome> for ChatResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            session: outcome.session,
            reply: outcome.reply,
            stored: outcome.stored,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OcrResponse {
    /// "stored" or "no_text".
    pub status: String,
    pub text: Option<String>,
    pub session: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArchivedChatView {
    pub index: usize,
    pub session: String,
    pub archived_at: DateTime<Utc>,
    pub message_count: usize,
    /// Start of the first message, for the history list.
    pub preview: String,
    pub messages: Vec<Message>,
}

impl ArchivedChatView {
    fn from_archived(index: usize, chat: &ArchivedChat) -> Self {
        let preview = chat
            .messages
            .first()
            .map(|m| m.content.chars().take(PREVIEW_CHARS).collect())
            .unwrap_or_default();
        Self {
            index,
            session: chat.session.clone(),
            archived_at: chat.archived_at,
            message_count: chat.messages.len(),
            preview,
            messages: chat.messages.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub chats: Vec<ArchivedChatView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewChatResponse {
    /// False when the current session had no messages to archive.
    pub archived: bool,
    pub archive_count: usize,
}

// =============================================================================
// Health and UI
// =============================================================================

/// GET /health - liveness, uptime and active backends.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        inference_mode: state.controller.client().backend_name().to_string(),
        model: state.config.inference.model.clone(),
        ocr_engine: state.ocr.name().to_string(),
    })
}

/// GET /ui - serve the self-contained chat page.
pub async fn ui() -> impl IntoResponse {
    Html(ocrchat_ui::dashboard::CHAT_HTML)
}

// =============================================================================
// Sessions
// =============================================================================

fn current_view(state: &AppState) -> Result<SessionView, ApiError> {
    Ok(state
        .controller
        .with_store(|store| SessionView::from_session(store.current()))?)
}

/// GET /sessions - session names in creation order plus the current one.
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<SessionsResponse>, ApiError> {
    let response = state.controller.with_store(|store| {
        let sessions = store
            .names()
            .into_iter()
            .filter_map(|name| store.get(&name))
            .map(|s| SessionSummary {
                name: s.name().to_string(),
                message_count: s.messages().len(),
                has_memory: s.memory_text().is_some(),
            })
            .collect();
        SessionsResponse {
            current: store.current_name().to_string(),
            sessions,
        }
    })?;
    Ok(Json(response))
}

/// POST /sessions - create a session and make it current.
///
/// Blank or duplicate names are a no-op, reported through `created`.
pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<SessionNameRequest>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let created = state.controller.create_session(&body.name)?;
    Ok(Json(CreateSessionResponse {
        created,
        current: state.controller.current_name()?,
    }))
}

/// POST /sessions/select - switch the current session.
pub async fn select_session(
    State(state): State<AppState>,
    Json(body): Json<SessionNameRequest>,
) -> Result<Json<SessionView>, ApiError> {
    state.controller.select_session(&body.name)?;
    Ok(Json(current_view(&state)?))
}

/// POST /sessions/clear - drop the current session's messages and memory.
pub async fn clear_session(State(state): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    state.controller.clear_current()?;
    Ok(Json(current_view(&state)?))
}

/// GET /sessions/current - the current session's full view.
pub async fn current_session(
    State(state): State<AppState>,
) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(current_view(&state)?))
}

/// PUT /sessions/current/memory - replace the memory text by hand.
pub async fn update_memory(
    State(state): State<AppState>,
    Json(body): Json<MemoryRequest>,
) -> Result<Json<SessionView>, ApiError> {
    state.controller.set_memory(&body.text)?;
    Ok(Json(current_view(&state)?))
}

// =============================================================================
// Chat
// =============================================================================

/// POST /chat - run one turn; responds once the reply is in.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let outcome = match body.session {
        Some(ref session) => state.controller.submit(session, &body.message).await?,
        None => state.controller.submit_current(&body.message).await?,
    };
    Ok(Json(outcome.into()))
}

// =============================================================================
// OCR
// =============================================================================

/// POST /ocr?filename=<name> - OCR the raw image body into memory text.
///
/// The route's body limit is `ocr.max_upload_bytes`; an oversized body is
/// reported as a JSON 413.
pub async fn ocr_upload(
    State(state): State<AppState>,
    Query(params): Query<OcrParams>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<OcrResponse>, ApiError> {
    let max_bytes = state.config.ocr.max_upload_bytes;
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(format!("Image is larger than {} bytes", max_bytes))
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    })?;

    let filename = params
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("'filename' query parameter is required".to_string()))?;

    let kind = validate_upload(&filename, &body, max_bytes)?;
    info!(filename = %filename, kind = kind.mime_type(), bytes = body.len(), "Image uploaded");

    let outcome = state
        .controller
        .ingest_ocr(state.ocr.as_ref(), &body)
        .await?;

    let response = match outcome {
        OcrOutcome::Stored { session, text } => OcrResponse {
            status: "stored".to_string(),
            text: Some(text),
            session,
        },
        OcrOutcome::NoText { session } => OcrResponse {
            status: "no_text".to_string(),
            text: None,
            session,
        },
    };
    Ok(Json(response))
}

/// POST /ocr/send - send the current memory text to the model as a user turn.
pub async fn ocr_send(State(state): State<AppState>) -> Result<Json<ChatResponse>, ApiError> {
    let outcome = state.controller.send_extracted().await?;
    Ok(Json(outcome.into()))
}

// =============================================================================
// History
// =============================================================================

/// GET /history - archived chats, oldest first.
pub async fn history(State(state): State<AppState>) -> Result<Json<HistoryResponse>, ApiError> {
    let chats = state.controller.with_store(|store| {
        store
            .archived()
            .iter()
            .enumerate()
            .map(|(i, chat)| ArchivedChatView::from_archived(i, chat))
            .collect()
    })?;
    Ok(Json(HistoryResponse { chats }))
}

/// POST /history/new - archive the current chat and start a fresh one.
pub async fn new_chat(State(state): State<AppState>) -> Result<Json<NewChatResponse>, ApiError> {
    let archived = state.controller.archive_and_reset()?;
    let archive_count = state.controller.with_store(|store| store.archived().len())?;
    Ok(Json(NewChatResponse {
        archived,
        archive_count,
    }))
}

/// POST /history/{index}/restore - load an archived chat into the current
/// session.
pub async fn restore_chat(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<SessionView>, ApiError> {
    state.controller.restore_archived(index)?;
    Ok(Json(current_view(&state)?))
}

// =============================================================================
// SSE stream
// =============================================================================

/// GET /stream - `refresh` events naming the session that changed.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>> + Send> {
    let rx = state.event_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(value) => {
            let data = serde_json::to_string(&value).unwrap_or_default();
            Some(Ok(Event::default().event("refresh").data(data)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
