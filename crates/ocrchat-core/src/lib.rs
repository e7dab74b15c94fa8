pub mod config;
pub mod error;
pub mod types;

pub use config::OcrChatConfig;
pub use error::{OcrChatError, Result};
pub use types::*;
