//! Conversation controller: the single path every user turn goes through.
//!
//! A turn appends the user message, builds the context, waits for the
//! inference client, appends the reply and signals a refresh. Typed questions
//! and extracted OCR text take exactly the same path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use ocrchat_core::types::Message;
use ocrchat_ocr::OcrService;

use crate::context::ContextBuilder;
use crate::error::ChatError;
use crate::inference::InferenceClient;
use crate::session::{SessionStore, TurnState};

/// Receives "session changed, re-render it" notifications.
pub trait RefreshSignal: Send + Sync {
    fn refresh(&self, session: &str);
}

/// Result of one completed turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub session: String,
    pub reply: String,
    /// False when the session was reset while the reply was pending and the
    /// reply was therefore dropped.
    pub stored: bool,
}

/// Result of running OCR on an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    /// Text was found and is now `session`'s memory text.
    Stored { session: String, text: String },
    /// OCR produced nothing usable; `session`'s memory text was left alone.
    NoText { session: String },
}

/// Owns the session store and runs turns against the inference client.
pub struct ConversationController {
    store: Mutex<SessionStore>,
    client: InferenceClient,
    builder: ContextBuilder,
    /// One lock per session name; held for the whole turn.
    turn_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    refresh: Option<Arc<dyn RefreshSignal>>,
}

impl ConversationController {
    pub fn new(store: SessionStore, client: InferenceClient) -> Self {
        Self {
            store: Mutex::new(store),
            client,
            builder: ContextBuilder::new(),
            turn_locks: Mutex::new(HashMap::new()),
            refresh: None,
        }
    }

    pub fn with_refresh(mut self, signal: Arc<dyn RefreshSignal>) -> Self {
        self.refresh = Some(signal);
        self
    }

    pub fn client(&self) -> &InferenceClient {
        &self.client
    }

    /// Run a user turn on `session`.
    ///
    /// Turns on the same session are queued behind each other; turns on
    /// different sessions run independently.
    pub async fn submit(&self, session: &str, user_text: &str) -> Result<TurnOutcome, ChatError> {
        if user_text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let exists = {
            let store = self.lock_store()?;
            store.contains(session)
        };
        if !exists {
            return Err(ChatError::SessionNotFound(session.to_string()));
        }

        let turn_lock = self.turn_lock(session)?;
        let _turn = turn_lock.lock().await;

        let (context, epoch) = {
            let mut store = self.lock_store()?;
            let entry = store
                .get_mut(session)
                .ok_or_else(|| ChatError::SessionNotFound(session.to_string()))?;
            entry.push(Message::user(user_text));
            entry.set_state(TurnState::AwaitingReply);
            (self.builder.build(entry), entry.epoch())
        };

        info!(session, entries = context.len(), "Submitting turn");
        let reply = self.client.complete(&context).await;

        let stored = {
            let mut store = self.lock_store()?;
            match store.get_mut(session) {
                Some(entry) => {
                    let current = entry.epoch() == epoch;
                    if current {
                        entry.push(Message::assistant(reply.clone()));
                    } else {
                        warn!(session, "Session was reset during the turn; reply dropped");
                    }
                    entry.set_state(TurnState::Idle);
                    current
                }
                None => false,
            }
        };

        self.signal_refresh(session);
        Ok(TurnOutcome {
            session: session.to_string(),
            reply,
            stored,
        })
    }

    /// Run a user turn on whichever session is current.
    pub async fn submit_current(&self, user_text: &str) -> Result<TurnOutcome, ChatError> {
        let name = self.current_name()?;
        self.submit(&name, user_text).await
    }

    /// Send the current session's memory text as if the user had typed it.
    pub async fn send_extracted(&self) -> Result<TurnOutcome, ChatError> {
        let (name, text) = {
            let store = self.lock_store()?;
            let current = store.current();
            (
                current.name().to_string(),
                current.memory_text().map(str::to_string),
            )
        };
        match text {
            Some(text) => self.submit(&name, &text).await,
            None => {
                warn!(session = %name, "No extracted text to send");
                Err(ChatError::EmptyMessage)
            }
        }
    }

    /// Run OCR on an uploaded image and remember the text in the session
    /// that was current when the upload arrived.
    ///
    /// OCR failures and blank results both count as "no text".
    pub async fn ingest_ocr<O: OcrService>(
        &self,
        ocr: &O,
        image: &[u8],
    ) -> Result<OcrOutcome, ChatError> {
        let session = self.current_name()?;

        let raw = match ocr.extract_text(image).await {
            Ok(text) => text,
            Err(e) => {
                warn!(session = %session, error = %e, "OCR failed; treating upload as having no text");
                String::new()
            }
        };
        let text = raw.trim();
        if text.is_empty() {
            warn!(session = %session, "No text detected in upload");
            return Ok(OcrOutcome::NoText { session });
        }

        self.lock_store()?.set_memory(&session, text)?;
        info!(session = %session, chars = text.len(), "OCR text added to memory");
        self.signal_refresh(&session);
        Ok(OcrOutcome::Stored {
            session,
            text: text.to_string(),
        })
    }

    // -- Session management --

    pub fn create_session(&self, name: &str) -> Result<bool, ChatError> {
        let (created, current) = {
            let mut store = self.lock_store()?;
            (store.create(name), store.current_name().to_string())
        };
        if created {
            self.signal_refresh(&current);
        }
        Ok(created)
    }

    pub fn select_session(&self, name: &str) -> Result<(), ChatError> {
        self.lock_store()?.select(name)?;
        self.signal_refresh(name);
        Ok(())
    }

    pub fn clear_current(&self) -> Result<(), ChatError> {
        let name = {
            let mut store = self.lock_store()?;
            store.clear_current();
            store.current_name().to_string()
        };
        self.signal_refresh(&name);
        Ok(())
    }

    pub fn archive_and_reset(&self) -> Result<bool, ChatError> {
        let (archived, name) = {
            let mut store = self.lock_store()?;
            (store.archive_and_reset(), store.current_name().to_string())
        };
        if archived {
            self.signal_refresh(&name);
        }
        Ok(archived)
    }

    pub fn restore_archived(&self, index: usize) -> Result<(), ChatError> {
        let name = {
            let mut store = self.lock_store()?;
            store.restore_archived(index)?;
            store.current_name().to_string()
        };
        self.signal_refresh(&name);
        Ok(())
    }

    /// Replace the current session's memory text (user edit).
    pub fn set_memory(&self, text: &str) -> Result<(), ChatError> {
        let name = {
            let mut store = self.lock_store()?;
            store.current_mut().set_memory_text(text);
            store.current_name().to_string()
        };
        self.signal_refresh(&name);
        Ok(())
    }

    pub fn current_name(&self) -> Result<String, ChatError> {
        Ok(self.lock_store()?.current_name().to_string())
    }

    /// Read the store under its lock.
    pub fn with_store<R>(&self, f: impl FnOnce(&SessionStore) -> R) -> Result<R, ChatError> {
        let store = self.lock_store()?;
        Ok(f(&store))
    }

    // -- Private helpers --

    fn lock_store(&self) -> Result<MutexGuard<'_, SessionStore>, ChatError> {
        self.store
            .lock()
            .map_err(|e| ChatError::StateError(format!("session store lock poisoned: {}", e)))
    }

    fn turn_lock(&self, session: &str) -> Result<Arc<tokio::sync::Mutex<()>>, ChatError> {
        let mut locks = self
            .turn_locks
            .lock()
            .map_err(|e| ChatError::StateError(format!("turn lock map poisoned: {}", e)))?;
        Ok(Arc::clone(locks.entry(session.to_string()).or_default()))
    }

    fn signal_refresh(&self, session: &str) {
        if let Some(ref signal) = self.refresh {
            debug!(session, "Signalling refresh");
            signal.refresh(session);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
