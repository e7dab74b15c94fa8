//! Tesseract OCR via the `tesseract` command-line tool.
//!
//! The image bytes are piped to `tesseract stdin stdout -l <lang>` and the
//! recognised text is read back from the child's stdout.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use ocrchat_core::config::OcrConfig;
use ocrchat_core::error::OcrChatError;

use crate::OcrService;

/// OCR service backed by a local tesseract installation.
#[derive(Debug, Clone)]
pub struct TesseractOcrService {
    command: String,
    language: String,
}

impl TesseractOcrService {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.tesseract_cmd.clone(),
            language: config.language.clone(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

impl OcrService for TesseractOcrService {
    async fn extract_text(&self, image_data: &[u8]) -> Result<String, OcrChatError> {
        if image_data.is_empty() {
            return Err(OcrChatError::Ocr("Empty image data".into()));
        }

        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                OcrChatError::Ocr(format!("Failed to start '{}': {}", self.command, e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrChatError::Ocr("tesseract stdin unavailable".into()))?;
        let data = image_data.to_vec();
        let writer = tokio::spawn(async move {
            stdin.write_all(&data).await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrChatError::Ocr(format!("tesseract did not finish: {}", e)))?;

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "tesseract closed stdin early"),
            Err(e) => debug!(error = %e, "stdin writer task failed"),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrChatError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(chars = text.len(), "tesseract OCR complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with_command(command: &str) -> TesseractOcrService {
        TesseractOcrService::new(&OcrConfig {
            tesseract_cmd: command.to_string(),
            ..OcrConfig::default()
        })
    }

    #[test]
    fn test_new_reads_config() {
        let service = TesseractOcrService::new(&OcrConfig {
            tesseract_cmd: "/opt/tesseract/bin/tesseract".to_string(),
            language: "deu+eng".to_string(),
            ..OcrConfig::default()
        });
        assert_eq!(service.command(), "/opt/tesseract/bin/tesseract");
        assert_eq!(service.language(), "deu+eng");
    }

    #[tokio::test]
    async fn test_empty_input_rejected_before_spawn() {
        let service = service_with_command("ocrchat-no-such-binary");
        let err = service.extract_text(&[]).await.unwrap_err();
        assert!(err.to_string().contains("Empty image data"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_ocr_error() {
        let service = service_with_command("ocrchat-no-such-binary");
        let err = service.extract_text(&[0x89, b'P', b'N', b'G']).await.unwrap_err();
        assert!(matches!(err, OcrChatError::Ocr(_)));
        assert!(err.to_string().contains("ocrchat-no-such-binary"));
    }
}
