//! Integration tests for the ocrchat API.
//!
//! Every test builds its own state with a mock inference backend and a mock
//! OCR engine, then drives the router with `oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use ocrchat_api::create_router;
use ocrchat_api::handlers::{
    ChatResponse, CreateSessionResponse, HealthResponse, HistoryResponse, NewChatResponse,
    OcrResponse, SessionView, SessionsResponse,
};
use ocrchat_api::state::AppState;
use ocrchat_chat::{InferenceClient, MockBackend};
use ocrchat_core::config::OcrChatConfig;
use ocrchat_ocr::{MockOcrService, OcrEngine};

// =============================================================================
// Helpers
// =============================================================================

fn make_state_with(config: OcrChatConfig, ocr: MockOcrService) -> AppState {
    let client = InferenceClient::new(Arc::new(MockBackend::echo()), Duration::from_secs(5));
    AppState::new(config, client, OcrEngine::Mock(ocr))
}

fn make_state() -> AppState {
    make_state_with(
        OcrChatConfig::default(),
        MockOcrService::with_text("  Total due: $42.00\n"),
    )
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn put_json(uri: &str, json: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn post_bytes(uri: &str, bytes: Vec<u8>) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/octet-stream")
        .body(Body::from(bytes))
        .unwrap()
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

async fn send(app: &axum::Router, req: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn json_of<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

// =============================================================================
// Health and UI
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = create_router(make_state());
    let resp = send(&app, get("/health")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let health: HealthResponse = json_of(resp).await;
    assert_eq!(health.status, "healthy");
    assert_eq!(health.inference_mode, "mock");
    assert_eq!(health.ocr_engine, "mock");
    assert_eq!(health.model, "llama3.2:1b");
}

#[tokio::test]
async fn test_ui_serves_html() {
    let app = create_router(make_state());
    let resp = send(&app, get("/ui")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let body = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(body.starts_with("<!DOCTYPE html>"));
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_initial_sessions() {
    let app = create_router(make_state());
    let sessions: SessionsResponse = json_of(send(&app, get("/sessions")).await).await;
    assert_eq!(sessions.current, "Default");
    assert_eq!(sessions.sessions.len(), 1);
    assert_eq!(sessions.sessions[0].message_count, 0);
}

#[tokio::test]
async fn test_create_session_becomes_current() {
    let app = create_router(make_state());
    let resp = send(&app, post_json("/sessions", r#"{"name":"Receipts"}"#)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let created: CreateSessionResponse = json_of(resp).await;
    assert!(created.created);
    assert_eq!(created.current, "Receipts");

    let sessions: SessionsResponse = json_of(send(&app, get("/sessions")).await).await;
    let names: Vec<&str> = sessions.sessions.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Default", "Receipts"]);
}

#[tokio::test]
async fn test_create_blank_or_duplicate_is_noop() {
    let app = create_router(make_state());
    let created: CreateSessionResponse =
        json_of(send(&app, post_json("/sessions", r#"{"name":"   "}"#)).await).await;
    assert!(!created.created);
    assert_eq!(created.current, "Default");

    let created: CreateSessionResponse =
        json_of(send(&app, post_json("/sessions", r#"{"name":"Default"}"#)).await).await;
    assert!(!created.created);

    let sessions: SessionsResponse = json_of(send(&app, get("/sessions")).await).await;
    assert_eq!(sessions.sessions.len(), 1);
}

#[tokio::test]
async fn test_select_session() {
    let app = create_router(make_state());
    send(&app, post_json("/sessions", r#"{"name":"B"}"#)).await;

    let resp = send(&app, post_json("/sessions/select", r#"{"name":"Default"}"#)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let view: SessionView = json_of(resp).await;
    assert_eq!(view.name, "Default");
}

#[tokio::test]
async fn test_select_missing_session_is_404() {
    let app = create_router(make_state());
    let resp = send(&app, post_json("/sessions/select", r#"{"name":"Ghost"}"#)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = json_of(resp).await;
    assert_eq!(body["error"], "not_found");

    let sessions: SessionsResponse = json_of(send(&app, get("/sessions")).await).await;
    assert_eq!(sessions.current, "Default");
}

#[tokio::test]
async fn test_update_memory() {
    let app = create_router(make_state());
    let resp = send(
        &app,
        put_json("/sessions/current/memory", r#"{"text":"  edited text "}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let view: SessionView = json_of(resp).await;
    assert_eq!(view.memory_text.as_deref(), Some("edited text"));

    let view: SessionView = json_of(
        send(&app, put_json("/sessions/current/memory", r#"{"text":""}"#)).await,
    )
    .await;
    assert!(view.memory_text.is_none());
}

// =============================================================================
// Chat
// =============================================================================

#[tokio::test]
async fn test_chat_on_current_session() {
    let app = create_router(make_state());
    let resp = send(&app, post_json("/chat", r#"{"message":"What is OCR?"}"#)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let chat: ChatResponse = json_of(resp).await;
    assert_eq!(chat.session, "Default");
    assert_eq!(chat.reply, "Mock reply to: What is OCR?");
    assert!(chat.stored);

    let view: SessionView = json_of(send(&app, get("/sessions/current")).await).await;
    assert_eq!(view.messages.len(), 2);
    assert_eq!(view.state, "idle");
}

#[tokio::test]
async fn test_chat_on_named_session_keeps_others_untouched() {
    let app = create_router(make_state());
    send(&app, post_json("/sessions", r#"{"name":"A"}"#)).await;
    send(&app, post_json("/sessions", r#"{"name":"B"}"#)).await;

    let resp = send(&app, post_json("/chat", r#"{"message":"hi","session":"A"}"#)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let sessions: SessionsResponse = json_of(send(&app, get("/sessions")).await).await;
    let count = |name: &str| {
        sessions
            .sessions
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.message_count)
            .unwrap()
    };
    assert_eq!(count("A"), 2);
    assert_eq!(count("B"), 0);
    assert_eq!(sessions.current, "B");
}

#[tokio::test]
async fn test_chat_empty_message_is_400() {
    let app = create_router(make_state());
    let resp = send(&app, post_json("/chat", r#"{"message":"   "}"#)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let view: SessionView = json_of(send(&app, get("/sessions/current")).await).await;
    assert!(view.messages.is_empty());
}

#[tokio::test]
async fn test_chat_unknown_session_is_404() {
    let app = create_router(make_state());
    let resp = send(&app, post_json("/chat", r#"{"message":"hi","session":"Nope"}"#)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_malformed_json_is_rejected() {
    let app = create_router(make_state());
    let resp = send(&app, post_json("/chat", r#"{"msg":1}"#)).await;
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn test_clear_session() {
    let app = create_router(make_state());
    send(&app, post_json("/chat", r#"{"message":"hello"}"#)).await;

    let resp = send(&app, post_empty("/sessions/clear")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let view: SessionView = json_of(resp).await;
    assert!(view.messages.is_empty());
    assert!(view.memory_text.is_none());
}

// =============================================================================
// OCR
// =============================================================================

#[tokio::test]
async fn test_ocr_upload_stores_trimmed_text() {
    let app = create_router(make_state());
    let resp = send(&app, post_bytes("/ocr?filename=receipt.png", vec![0x89, 0x50, 0x4e, 0x47])).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let ocr: OcrResponse = json_of(resp).await;
    assert_eq!(ocr.status, "stored");
    assert_eq!(ocr.text.as_deref(), Some("Total due: $42.00"));

    let view: SessionView = json_of(send(&app, get("/sessions/current")).await).await;
    assert_eq!(view.memory_text.as_deref(), Some("Total due: $42.00"));
    // Uploading does not add messages.
    assert!(view.messages.is_empty());
}

#[tokio::test]
async fn test_ocr_upload_extension_is_case_insensitive() {
    let app = create_router(make_state());
    let resp = send(&app, post_bytes("/ocr?filename=SCAN.JPEG", vec![0xff, 0xd8])).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_ocr_upload_rejects_other_types() {
    let app = create_router(make_state());
    for name in ["anim.gif", "doc.pdf", "noextension"] {
        let resp = send(&app, post_bytes(&format!("/ocr?filename={}", name), vec![1, 2, 3])).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", name);
    }
    let view: SessionView = json_of(send(&app, get("/sessions/current")).await).await;
    assert!(view.memory_text.is_none());
}

#[tokio::test]
async fn test_ocr_upload_requires_filename() {
    let app = create_router(make_state());
    let resp = send(&app, post_bytes("/ocr", vec![1, 2, 3])).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ocr_upload_over_limit_is_413() {
    let mut config = OcrChatConfig::default();
    config.ocr.max_upload_bytes = 16;
    let app = create_router(make_state_with(config, MockOcrService::new()));

    let resp = send(&app, post_bytes("/ocr?filename=big.png", vec![7u8; 64])).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = json_of(resp).await;
    assert_eq!(body["error"], "payload_too_large");
    assert_eq!(body["message"], "Image is larger than 16 bytes");

    // An upload exactly at the limit is accepted.
    let resp = send(&app, post_bytes("/ocr?filename=edge.png", vec![7u8; 16])).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_ocr_upload_reports_session_current_at_upload() {
    let app = create_router(make_state());
    send(&app, post_json("/sessions", r#"{"name":"Receipts"}"#)).await;

    let ocr: OcrResponse =
        json_of(send(&app, post_bytes("/ocr?filename=r.png", vec![1, 2])).await).await;
    assert_eq!(ocr.session, "Receipts");
}

#[tokio::test]
async fn test_ocr_blank_image_leaves_memory_empty() {
    let app = create_router(make_state_with(
        OcrChatConfig::default(),
        MockOcrService::with_text("   \n "),
    ));
    let ocr: OcrResponse =
        json_of(send(&app, post_bytes("/ocr?filename=blank.png", vec![1])).await).await;
    assert_eq!(ocr.status, "no_text");
    assert!(ocr.text.is_none());

    let view: SessionView = json_of(send(&app, get("/sessions/current")).await).await;
    assert!(view.memory_text.is_none());
}

#[tokio::test]
async fn test_ocr_send_submits_memory_text() {
    let app = create_router(make_state());
    send(&app, post_bytes("/ocr?filename=receipt.png", vec![1, 2])).await;

    let resp = send(&app, post_empty("/ocr/send")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let chat: ChatResponse = json_of(resp).await;
    assert_eq!(chat.reply, "Mock reply to: Total due: $42.00");

    let view: SessionView = json_of(send(&app, get("/sessions/current")).await).await;
    assert_eq!(view.messages[0].content, "Total due: $42.00");
}

#[tokio::test]
async fn test_ocr_send_without_memory_is_400() {
    let app = create_router(make_state());
    let resp = send(&app, post_empty("/ocr/send")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn test_new_chat_on_empty_session_is_noop() {
    let app = create_router(make_state());
    let resp: NewChatResponse = json_of(send(&app, post_empty("/history/new")).await).await;
    assert!(!resp.archived);
    assert_eq!(resp.archive_count, 0);
}

#[tokio::test]
async fn test_archive_and_restore() {
    let app = create_router(make_state());
    send(&app, post_json("/chat", r#"{"message":"first conversation"}"#)).await;

    let resp: NewChatResponse = json_of(send(&app, post_empty("/history/new")).await).await;
    assert!(resp.archived);
    assert_eq!(resp.archive_count, 1);

    let view: SessionView = json_of(send(&app, get("/sessions/current")).await).await;
    assert!(view.messages.is_empty());

    let history: HistoryResponse = json_of(send(&app, get("/history")).await).await;
    assert_eq!(history.chats.len(), 1);
    assert_eq!(history.chats[0].index, 0);
    assert_eq!(history.chats[0].session, "Default");
    assert_eq!(history.chats[0].message_count, 2);
    assert_eq!(history.chats[0].preview, "first conversation");

    let resp = send(&app, post_empty("/history/0/restore")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let view: SessionView = json_of(resp).await;
    assert_eq!(view.messages.len(), 2);

    // Restoring copies; the archive keeps its entry.
    let history: HistoryResponse = json_of(send(&app, get("/history")).await).await;
    assert_eq!(history.chats.len(), 1);
}

#[tokio::test]
async fn test_restore_missing_index_is_404() {
    let app = create_router(make_state());
    let resp = send(&app, post_empty("/history/3/restore")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Refresh events
// =============================================================================

#[tokio::test]
async fn test_turn_broadcasts_refresh_event() {
    let state = make_state();
    let mut rx = state.event_tx.subscribe();
    let app = create_router(state);

    send(&app, post_json("/chat", r#"{"message":"ping"}"#)).await;

    let event = rx.try_recv().unwrap();
    assert_eq!(event["session"], "Default");
}

#[tokio::test]
async fn test_rejected_request_broadcasts_nothing() {
    let state = make_state();
    let mut rx = state.event_tx.subscribe();
    let app = create_router(state);

    send(&app, post_json("/chat", r#"{"message":""}"#)).await;
    send(&app, post_json("/sessions/select", r#"{"name":"Ghost"}"#)).await;

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_stream_is_event_stream() {
    let app = create_router(make_state());
    let resp = send(&app, get("/stream")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"));
}
