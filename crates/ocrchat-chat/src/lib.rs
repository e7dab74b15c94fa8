//! Conversation core for ocrchat.
//!
//! Holds named chat sessions and their remembered OCR text, builds the
//! context sent to the model, talks to the inference backend, and drives
//! one user turn at a time through the conversation controller.

pub mod context;
pub mod controller;
pub mod error;
pub mod inference;
pub mod session;

pub use context::ContextBuilder;
pub use controller::{ConversationController, OcrOutcome, RefreshSignal, TurnOutcome};
pub use error::{ChatError, InferenceError};
pub use inference::{
    ChatBackend, GenerateBackend, InferenceBackend, InferenceClient, MockBackend,
    NO_RESPONSE_REPLY, WARNING_MARKER,
};
pub use session::{ArchivedChat, Session, SessionStore, TurnState};
