//! ocrchat API crate - axum HTTP server, route handlers, SSE refresh stream.
//!
//! Exposes the chat page and the session, chat, OCR and history operations
//! as JSON routes on localhost.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
