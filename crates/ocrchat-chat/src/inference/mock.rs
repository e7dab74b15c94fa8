//! Offline backend for tests and `mode = "mock"`.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use ocrchat_core::types::{Message, Role};

use super::InferenceBackend;
use crate::error::InferenceError;

#[derive(Debug)]
enum Behavior {
    /// Reply with the last user message, prefixed.
    Echo,
    Fixed(String),
    Fail(InferenceError),
}

/// Deterministic backend that records every context it receives.
#[derive(Debug)]
pub struct MockBackend {
    behavior: Behavior,
    delay: Option<Duration>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockBackend {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies `"Mock reply to: <last user message>"`.
    pub fn echo() -> Self {
        Self::with_behavior(Behavior::Echo)
    }

    /// Always replies with `reply`.
    pub fn replying(reply: &str) -> Self {
        Self::with_behavior(Behavior::Fixed(reply.to_string()))
    }

    /// Always fails with `err`.
    pub fn failing(err: InferenceError) -> Self {
        Self::with_behavior(Behavior::Fail(err))
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Contexts received so far, oldest first.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl InferenceBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, context: &[Message]) -> Result<String, InferenceError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(context.to_vec());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            Behavior::Echo => {
                let last = context
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or_default();
                Ok(format!("Mock reply to: {}", last))
            }
            Behavior::Fixed(reply) => Ok(reply.clone()),
            Behavior::Fail(err) => Err(err.clone()),
        }
    }
}
