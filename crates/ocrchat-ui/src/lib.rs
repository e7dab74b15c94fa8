//! ocrchat UI crate - embedded chat page.
//!
//! The page is a single self-contained HTML file compiled into the binary
//! with `include_str!`. It talks to the JSON routes of `ocrchat-api` and
//! re-renders whenever the server pushes a `refresh` event on `/stream`.
//!
//! ```rust,ignore
//! use ocrchat_ui::dashboard::CHAT_HTML;
//!
//! async fn ui_handler() -> axum::response::Html<&'static str> {
//!     axum::response::Html(CHAT_HTML)
//! }
//! ```

pub mod dashboard;

pub use dashboard::CHAT_HTML;
