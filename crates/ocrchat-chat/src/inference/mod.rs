//! Inference client and backend adapters.
//!
//! `InferenceClient` is the only thing the controller talks to. It runs one
//! attempt against the configured `InferenceBackend`, bounds it with a
//! timeout, and turns every failure into a warning reply so the conversation
//! never stops on a backend problem.

pub mod chat;
pub mod generate;
pub mod mock;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use ocrchat_core::config::{InferenceConfig, InferenceMode};
use ocrchat_core::types::Message;

use crate::error::InferenceError;

pub use chat::ChatBackend;
pub use generate::{flatten_prompt, parse_fragment, Fragment, GenerateBackend};
pub use mock::MockBackend;

/// Marker that starts every reply standing in for a failed or empty call.
pub const WARNING_MARKER: &str = "⚠️";

/// Reply used when the generate stream carried no text at all.
pub const NO_RESPONSE_REPLY: &str = "⚠️ No response from the model";

/// One way of reaching a language model.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Short adapter name for logs and health output.
    fn name(&self) -> &str;

    /// Send the context and return the model's complete reply text.
    async fn send(&self, context: &[Message]) -> Result<String, InferenceError>;
}

/// Infallible completion front-end over a backend adapter.
#[derive(Clone)]
pub struct InferenceClient {
    backend: Arc<dyn InferenceBackend>,
    timeout: Duration,
}

impl InferenceClient {
    pub fn new(backend: Arc<dyn InferenceBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Build the adapter selected by `config.mode`.
    pub fn from_config(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let backend: Arc<dyn InferenceBackend> = match config.mode {
            InferenceMode::Generate => Arc::new(GenerateBackend::new(config)?),
            InferenceMode::Chat => Arc::new(ChatBackend::new(config)?),
            InferenceMode::Mock => Arc::new(MockBackend::echo()),
        };
        debug!(backend = backend.name(), model = %config.model, "Inference client ready");
        Ok(Self::new(backend, timeout))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one completion attempt. Never fails: errors and timeouts come back
    /// as warning-marked text. A successful reply is returned unchanged.
    pub async fn complete(&self, context: &[Message]) -> String {
        let start = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.backend.send(context)).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(reply)) => {
                debug!(
                    backend = self.backend.name(),
                    elapsed_ms,
                    chars = reply.len(),
                    "Completion received"
                );
                reply
            }
            Ok(Err(e)) => {
                warn!(backend = self.backend.name(), error = %e, elapsed_ms, "Completion failed");
                failure_reply(&e)
            }
            Err(_) => {
                let e = InferenceError::Timeout(self.timeout.as_secs());
                warn!(backend = self.backend.name(), error = %e, "Completion timed out");
                failure_reply(&e)
            }
        }
    }
}

/// The user-visible reply for a failed attempt.
pub fn failure_reply(err: &InferenceError) -> String {
    format!("{} Request failed: {}", WARNING_MARKER, err)
}

/// Whether a reply is a stand-in warning rather than model output.
pub fn is_warning(reply: &str) -> bool {
    reply.starts_with(WARNING_MARKER)
}

/// Turn a non-2xx response into `InferenceError::Status`.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, InferenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(InferenceError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Shared HTTP client with the request timeout applied.
pub(crate) fn http_client(config: &InferenceConfig) -> Result<reqwest::Client, InferenceError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .build()
        .map_err(|e| InferenceError::Transport(format!("failed to build HTTP client: {}", e)))
}
