//! Chat page HTML embedding.
//!
//! One self-contained HTML file with inline CSS and JavaScript: a session
//! sidebar, image upload, the editable memory text, archived chat history and
//! the message log with a "Thinking..." placeholder while a reply is pending.

/// The complete self-contained chat page, served from `/ui`.
pub const CHAT_HTML: &str = include_str!("../assets/chat.html");
