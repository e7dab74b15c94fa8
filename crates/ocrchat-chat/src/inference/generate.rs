//! Single-prompt mode: `/api/generate` with a newline-delimited JSON stream.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

use ocrchat_core::config::InferenceConfig;
use ocrchat_core::types::{Message, Role};

use super::{ensure_success, http_client, InferenceBackend, NO_RESPONSE_REPLY};
use crate::error::InferenceError;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
}

/// One line of the generate stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// A piece of the reply.
    Text(String),
    /// Valid JSON without a `response` string, or not JSON at all.
    Skipped,
}

/// Parse one stream line into a fragment.
pub fn parse_fragment(line: &[u8]) -> Fragment {
    match serde_json::from_slice::<GenerateChunk>(line) {
        Ok(GenerateChunk {
            response: Some(text),
        }) => Fragment::Text(text),
        Ok(_) => Fragment::Skipped,
        Err(e) => {
            debug!(error = %e, "Skipping malformed stream line");
            Fragment::Skipped
        }
    }
}

/// Flatten a structured context into a scripted dialogue ending with an
/// open `Assistant:` turn.
pub fn flatten_prompt(preamble: &str, context: &[Message]) -> String {
    let mut prompt = String::new();
    if !preamble.trim().is_empty() {
        prompt.push_str(preamble.trim());
        prompt.push_str("\n\n");
    }
    for message in context {
        prompt.push_str(message.role.label());
        prompt.push_str(": ");
        prompt.push_str(&message.content);
        prompt.push('\n');
    }
    prompt.push_str(Role::Assistant.label());
    prompt.push(':');
    prompt
}

/// Streaming single-prompt adapter.
pub struct GenerateBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    preamble: String,
}

impl GenerateBackend {
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            preamble: config.system_preamble.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl InferenceBackend for GenerateBackend {
    fn name(&self) -> &str {
        "generate"
    }

    async fn send(&self, context: &[Message]) -> Result<String, InferenceError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: flatten_prompt(&self.preamble, context),
            stream: true,
        };

        debug!(model = %self.model, url = %self.endpoint(), "Sending generate request");

        let response = self.client.post(self.endpoint()).json(&body).send().await?;
        let response = ensure_success(response).await?;

        let byte_stream = response
            .bytes_stream()
            .map(|result| result.map_err(std::io::Error::other));
        let reader = tokio::io::BufReader::new(StreamReader::new(byte_stream));
        let mut lines = reader.split(b'\n');

        let mut output = String::new();
        let mut skipped = 0usize;
        while let Some(line) = lines
            .next_segment()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?
        {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match parse_fragment(&line) {
                Fragment::Text(text) => output.push_str(&text),
                Fragment::Skipped => skipped += 1,
            }
        }

        debug!(chars = output.len(), skipped, "Generate stream finished");
        if output.is_empty() {
            warn!(model = %self.model, "Generate stream carried no text");
            return Ok(NO_RESPONSE_REPLY.to_string());
        }
        Ok(output)
    }
}
