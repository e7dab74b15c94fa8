//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use ocrchat_core::config::OcrChatConfig;
use ocrchat_core::error::OcrChatError;

use crate::handlers;
use crate::state::AppState;

/// Body limit for JSON routes.
const JSON_BODY_LIMIT: usize = 1024 * 1024;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let port = state.config.general.port;
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", port),
        format!("http://localhost:{}", port),
    ]
    .iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let upload_limit = state.config.ocr.max_upload_bytes;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/ui", get(handlers::ui))
        .route(
            "/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route("/sessions/select", post(handlers::select_session))
        .route("/sessions/clear", post(handlers::clear_session))
        .route("/sessions/current", get(handlers::current_session))
        .route("/sessions/current/memory", put(handlers::update_memory))
        .route("/chat", post(handlers::chat))
        .route(
            "/ocr",
            post(handlers::ocr_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/ocr/send", post(handlers::ocr_send))
        .route("/history", get(handlers::history))
        .route("/history/new", post(handlers::new_chat))
        .route("/history/{index}/restore", post(handlers::restore_chat))
        .route("/stream", get(handlers::stream))
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on 127.0.0.1 at the configured port.
pub async fn start_server(config: &OcrChatConfig, state: AppState) -> Result<(), OcrChatError> {
    let addr = format!("127.0.0.1:{}", config.general.port);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| OcrChatError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| OcrChatError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
