//! Builds the ordered context sent to the model for one completion.

use ocrchat_core::types::Message;

use crate::session::Session;

/// Prefix of the system entry carrying a session's remembered OCR text.
pub const EXTRACTED_TEXT_PREFIX: &str = "Extracted text: ";

/// Assembles context entries from a session.
///
/// The context is rebuilt from scratch on every call, so memory edits and
/// earlier turns are always reflected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextBuilder;

impl ContextBuilder {
    pub fn new() -> Self {
        Self
    }

    /// The remembered OCR text (if any) as a system entry, followed by every
    /// message in order.
    pub fn build(&self, session: &Session) -> Vec<Message> {
        let memory = session.memory_text().filter(|text| !text.is_empty());
        let mut context = Vec::with_capacity(session.messages().len() + 1);
        if let Some(text) = memory {
            context.push(Message::system(format!("{}{}", EXTRACTED_TEXT_PREFIX, text)));
        }
        context.extend_from_slice(session.messages());
        context
    }
}
