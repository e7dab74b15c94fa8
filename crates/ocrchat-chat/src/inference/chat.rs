//! Structured-chat mode: one blocking `/api/chat` call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ocrchat_core::config::InferenceConfig;
use ocrchat_core::types::Message;

use super::{ensure_success, http_client, InferenceBackend};
use crate::error::InferenceError;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatReply {
    message: ChatReplyMessage,
}

#[derive(Deserialize)]
struct ChatReplyMessage {
    content: String,
}

/// Sends the structured role/content list and returns the single reply.
pub struct ChatBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl ChatBackend {
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[async_trait]
impl InferenceBackend for ChatBackend {
    fn name(&self) -> &str {
        "chat"
    }

    async fn send(&self, context: &[Message]) -> Result<String, InferenceError> {
        let body = ChatRequest {
            model: &self.model,
            messages: context,
            stream: false,
        };

        debug!(model = %self.model, entries = context.len(), "Sending chat request");

        let response = self.client.post(self.endpoint()).json(&body).send().await?;
        let response = ensure_success(response).await?;
        let text = response.text().await?;

        let reply: ChatReply = serde_json::from_str(&text)
            .map_err(|e| InferenceError::Parse(format!("unexpected chat response: {}", e)))?;
        Ok(reply.message.content)
    }
}
