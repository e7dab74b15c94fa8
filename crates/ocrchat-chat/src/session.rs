//! Named conversation sessions and the process-wide session store.
//!
//! A `SessionStore` always has a current session: it starts with one default
//! session and sessions are never removed, only cleared.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use ocrchat_core::types::Message;

use crate::error::ChatError;

/// Fallback name when the configured default session name is blank.
const FALLBACK_SESSION_NAME: &str = "Default";

// =============================================================================
// TurnState
// =============================================================================

/// Per-session turn state: `Idle -> AwaitingReply -> Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// Ready for the next input.
    #[default]
    Idle,
    /// A user message was appended and the model call is in flight.
    AwaitingReply,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnState::Idle => write!(f, "Idle"),
            TurnState::AwaitingReply => write!(f, "AwaitingReply"),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// One named conversation thread.
#[derive(Debug, Clone)]
pub struct Session {
    name: String,
    messages: Vec<Message>,
    memory_text: Option<String>,
    state: TurnState,
    /// Bumped whenever the message log is reset, so a reply computed for the
    /// old log can be recognised as stale.
    epoch: u64,
}

impl Session {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: Vec::new(),
            memory_text: None,
            state: TurnState::Idle,
            epoch: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Messages in chronological order, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The remembered OCR text, if any.
    pub fn memory_text(&self) -> Option<&str> {
        self.memory_text.as_deref()
    }

    /// Replace the remembered OCR text. Blank text clears it.
    pub fn set_memory_text(&mut self, text: &str) {
        let trimmed = text.trim();
        self.memory_text = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn set_state(&mut self, state: TurnState) {
        if self.state != state {
            debug!(session = %self.name, "Turn state: {} -> {}", self.state, state);
            self.state = state;
        }
    }

    /// Empty the message log and start a new epoch.
    fn reset_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.epoch += 1;
    }
}

// =============================================================================
// ArchivedChat
// =============================================================================

/// A frozen copy of a message list taken by `archive_and_reset`.
#[derive(Debug, Clone, Serialize)]
pub struct ArchivedChat {
    /// Session the messages were archived from.
    pub session: String,
    pub messages: Vec<Message>,
    pub archived_at: DateTime<Utc>,
}

// =============================================================================
// SessionStore
// =============================================================================

/// Owns every session, the current-session pointer, and the chat archive.
#[derive(Debug, Clone)]
pub struct SessionStore {
    /// Sessions in creation order.
    sessions: Vec<Session>,
    /// Index into `sessions`; always in bounds.
    current: usize,
    archive: Vec<ArchivedChat>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(FALLBACK_SESSION_NAME)
    }
}

impl SessionStore {
    /// Create a store holding one empty session, which is current.
    pub fn new(default_session: &str) -> Self {
        let name = match default_session.trim() {
            "" => FALLBACK_SESSION_NAME,
            trimmed => trimmed,
        };
        Self {
            sessions: vec![Session::new(name)],
            current: 0,
            archive: Vec::new(),
        }
    }

    /// Create a session and make it current.
    ///
    /// Blank or already-used names are ignored and leave the store untouched.
    /// Returns whether a session was created.
    pub fn create(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.position(name).is_some() {
            debug!(name, "Ignoring create for blank or existing session");
            return false;
        }
        self.sessions.push(Session::new(name));
        self.current = self.sessions.len() - 1;
        info!(session = name, "Session created");
        true
    }

    /// Make an existing session current.
    pub fn select(&mut self, name: &str) -> Result<(), ChatError> {
        let idx = self
            .position(name)
            .ok_or_else(|| ChatError::SessionNotFound(name.to_string()))?;
        self.current = idx;
        debug!(session = name, "Session selected");
        Ok(())
    }

    /// Reset the current session's messages and memory text.
    pub fn clear_current(&mut self) {
        let session = &mut self.sessions[self.current];
        session.reset_messages(Vec::new());
        session.memory_text = None;
        info!(session = %session.name, "Session cleared");
    }

    /// Archive a copy of the current message list, then empty it.
    ///
    /// Does nothing when the list is already empty. Returns whether an
    /// archive entry was added.
    pub fn archive_and_reset(&mut self) -> bool {
        let session = &mut self.sessions[self.current];
        if session.messages.is_empty() {
            return false;
        }
        self.archive.push(ArchivedChat {
            session: session.name.clone(),
            messages: session.messages.clone(),
            archived_at: Utc::now(),
        });
        session.reset_messages(Vec::new());
        info!(
            session = %session.name,
            archived = self.archive.len(),
            "Chat archived"
        );
        true
    }

    /// Archived chats, oldest first.
    pub fn archived(&self) -> &[ArchivedChat] {
        &self.archive
    }

    /// Load a copy of an archived chat into the current session.
    ///
    /// The archive entry itself is left as it was.
    pub fn restore_archived(&mut self, index: usize) -> Result<(), ChatError> {
        let messages = self
            .archive
            .get(index)
            .map(|chat| chat.messages.clone())
            .ok_or(ChatError::ArchiveNotFound(index))?;
        let session = &mut self.sessions[self.current];
        session.reset_messages(messages);
        debug!(session = %session.name, index, "Archived chat restored");
        Ok(())
    }

    pub fn current_name(&self) -> &str {
        &self.sessions[self.current].name
    }

    pub fn current(&self) -> &Session {
        &self.sessions[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Session {
        &mut self.sessions[self.current]
    }

    pub fn get(&self, name: &str) -> Option<&Session> {
        self.position(name).map(|idx| &self.sessions[idx])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Session> {
        let idx = self.position(name)?;
        Some(&mut self.sessions[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Session names in creation order.
    pub fn names(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Replace a session's remembered OCR text (blank clears it).
    pub fn set_memory(&mut self, name: &str, text: &str) -> Result<(), ChatError> {
        let session = self
            .get_mut(name)
            .ok_or_else(|| ChatError::SessionNotFound(name.to_string()))?;
        session.set_memory_text(text);
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.name == name)
    }
}

// =============================================================================
// Tests
// =============================================================================
