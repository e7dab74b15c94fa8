use thiserror::Error;

/// Top-level error type for ocrchat.
///
/// Subsystem crates define their own error types and convert into this one
/// at crate boundaries so `?` works across them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OcrChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for OcrChatError {
    fn from(err: toml::de::Error) -> Self {
        OcrChatError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for OcrChatError {
    fn from(err: toml::ser::Error) -> Self {
        OcrChatError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for OcrChatError {
    fn from(err: serde_json::Error) -> Self {
        OcrChatError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for ocrchat operations.
pub type Result<T> = std::result::Result<T, OcrChatError>;
