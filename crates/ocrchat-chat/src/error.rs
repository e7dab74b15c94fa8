//! Error types for the conversation core.

use ocrchat_core::error::OcrChatError;

/// Errors from session management and the conversation controller.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("no archived chat at index {0}")]
    ArchiveNotFound(usize),
    #[error("state error: {0}")]
    StateError(String),
}

impl From<ChatError> for OcrChatError {
    fn from(err: ChatError) -> Self {
        OcrChatError::Api(err.to_string())
    }
}

/// Errors from a single inference backend attempt.
///
/// These never reach the controller; `InferenceClient` turns them into a
/// warning reply.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InferenceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Parse(String),
    #[error("no reply within {0}s")]
    Timeout(u64),
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            InferenceError::Parse(err.to_string())
        } else {
            InferenceError::Transport(err.to_string())
        }
    }
}

impl From<InferenceError> for OcrChatError {
    fn from(err: InferenceError) -> Self {
        OcrChatError::Inference(err.to_string())
    }
}
