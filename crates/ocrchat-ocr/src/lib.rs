//! ocrchat OCR crate - OCR engine trait and implementations.
//!
//! Provides the OcrService trait for text extraction from uploaded images,
//! a MockOcrService for testing, a TesseractOcrService that pipes the image
//! through the `tesseract` CLI, and the upload file-type checks.

pub mod tesseract;
pub mod upload;

use ocrchat_core::config::OcrConfig;
use ocrchat_core::error::OcrChatError;

pub use tesseract::TesseractOcrService;
pub use upload::{validate_upload, ImageKind, ALLOWED_EXTENSIONS};

/// Service for extracting text from image files.
///
/// Implementations wrap an OCR engine behind a uniform async interface.
/// Extraction is best-effort: an empty string means "no text detected".
pub trait OcrService: Send + Sync {
    /// Extract text from encoded image bytes (PNG or JPEG).
    fn extract_text(
        &self,
        image_data: &[u8],
    ) -> impl std::future::Future<Output = Result<String, OcrChatError>> + Send;
}

/// Stand-in OCR engine for tests and `engine = "mock"`.
///
/// Ignores the image content and answers every upload with a fixed text,
/// which may be blank to model an image without readable text.
#[derive(Debug, Clone)]
pub struct MockOcrService {
    response_text: String,
}

impl MockOcrService {
    /// Answers uploads with a short sample receipt line.
    pub fn new() -> Self {
        Self {
            response_text: "Receipt total: $12.50".to_string(),
        }
    }

    /// Answers uploads with `text`, untrimmed.
    pub fn with_text(text: &str) -> Self {
        Self {
            response_text: text.to_string(),
        }
    }

    /// Answers uploads with nothing, like a photo with no text in it.
    pub fn empty() -> Self {
        Self {
            response_text: String::new(),
        }
    }
}

impl Default for MockOcrService {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrService for MockOcrService {
    async fn extract_text(&self, image_data: &[u8]) -> Result<String, OcrChatError> {
        if image_data.is_empty() {
            return Err(OcrChatError::Ocr("Upload contained no image bytes".to_string()));
        }
        Ok(self.response_text.clone())
    }
}

/// The OCR engine selected by configuration.
#[derive(Debug, Clone)]
pub enum OcrEngine {
    Tesseract(TesseractOcrService),
    Mock(MockOcrService),
}

impl OcrEngine {
    /// Build the engine named by `config.engine`.
    ///
    /// Unknown engine names fall back to tesseract with a warning.
    pub fn from_config(config: &OcrConfig) -> Self {
        match config.engine.as_str() {
            "mock" => OcrEngine::Mock(MockOcrService::new()),
            "tesseract" => OcrEngine::Tesseract(TesseractOcrService::new(config)),
            other => {
                tracing::warn!(engine = other, "Unknown OCR engine, using tesseract");
                OcrEngine::Tesseract(TesseractOcrService::new(config))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OcrEngine::Tesseract(_) => "tesseract",
            OcrEngine::Mock(_) => "mock",
        }
    }
}

impl OcrService for OcrEngine {
    async fn extract_text(&self, image_data: &[u8]) -> Result<String, OcrChatError> {
        match self {
            OcrEngine::Tesseract(svc) => svc.extract_text(image_data).await,
            OcrEngine::Mock(svc) => svc.extract_text(image_data).await,
        }
    }
}
