//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use tracing::trace;

use ocrchat_chat::{ConversationController, InferenceClient, RefreshSignal, SessionStore};
use ocrchat_core::config::OcrChatConfig;
use ocrchat_ocr::OcrEngine;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks. Session data
/// lives inside the controller, behind its own lock.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<OcrChatConfig>,
    pub controller: Arc<ConversationController>,
    pub ocr: Arc<OcrEngine>,
    /// Broadcast sender for SSE refresh events.
    pub event_tx: broadcast::Sender<serde_json::Value>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Build the state, wiring the controller's refresh signal to the SSE
    /// broadcast channel.
    pub fn new(config: OcrChatConfig, client: InferenceClient, ocr: OcrEngine) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let signal = Arc::new(BroadcastRefresh {
            tx: event_tx.clone(),
        });
        let store = SessionStore::new(&config.general.default_session);
        let controller = ConversationController::new(store, client).with_refresh(signal);

        Self {
            config: Arc::new(config),
            controller: Arc::new(controller),
            ocr: Arc::new(ocr),
            event_tx,
            start_time: Instant::now(),
        }
    }
}

/// Forwards refresh signals to every connected `/stream` client.
struct BroadcastRefresh {
    tx: broadcast::Sender<serde_json::Value>,
}

impl RefreshSignal for BroadcastRefresh {
    fn refresh(&self, session: &str) {
        // Err only means nobody is listening.
        if self
            .tx
            .send(serde_json::json!({ "session": session }))
            .is_err()
        {
            trace!(session, "No SSE subscribers for refresh");
        }
    }
}
