use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{OcrChatError, Result};

/// Top-level configuration for ocrchat.
///
/// Loaded from `~/.ocrchat/config.toml` by default. Every section falls back
/// to its defaults when absent, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrChatConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
}

impl OcrChatConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: OcrChatConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Port the local HTTP surface listens on (bound to 127.0.0.1).
    pub port: u16,
    /// Name of the session that exists from process start.
    pub default_session: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            port: 8501,
            default_session: "Default".to_string(),
        }
    }
}

/// Which backend adapter the inference client talks through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceMode {
    /// Flatten the conversation into one prompt and stream NDJSON fragments.
    #[default]
    Generate,
    /// Send structured role/content messages in one blocking call.
    Chat,
    /// Canned offline replies; no network.
    Mock,
}

impl fmt::Display for InferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceMode::Generate => write!(f, "generate"),
            InferenceMode::Chat => write!(f, "chat"),
            InferenceMode::Mock => write!(f, "mock"),
        }
    }
}

impl std::str::FromStr for InferenceMode {
    type Err = OcrChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generate" => Ok(InferenceMode::Generate),
            "chat" => Ok(InferenceMode::Chat),
            "mock" => Ok(InferenceMode::Mock),
            other => Err(OcrChatError::Config(format!(
                "unknown inference mode '{}' (expected generate, chat or mock)",
                other
            ))),
        }
    }
}

/// Language-model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub mode: InferenceMode,
    /// Base URL of the Ollama-compatible server.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Upper bound on a single completion attempt, in seconds.
    pub timeout_secs: u64,
    /// Opening line of the flattened prompt in generate mode.
    pub system_preamble: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            mode: InferenceMode::Generate,
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:1b".to_string(),
            timeout_secs: 120,
            system_preamble: "You are a helpful assistant.".to_string(),
        }
    }
}

/// OCR engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// OCR engine: "tesseract" or "mock".
    pub engine: String,
    /// Executable invoked for tesseract OCR.
    pub tesseract_cmd: String,
    /// Tesseract language code (e.g. "eng", "deu+eng").
    pub language: String,
    /// Largest accepted image upload, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: "tesseract".to_string(),
            tesseract_cmd: "tesseract".to_string(),
            language: "eng".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}
