//! Audit client: prompt in, raw reply out

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use crate::endpoint::{ModelEndpoint, ModelRequest};
use crate::error::RemoteFailure;
use crate::gemini::DEFAULT_TIMEOUT;
use crate::prompt::{AppMetadata, SYSTEM_PROMPT, build_user_prompt};

/// Unparsed model output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReply {
    pub text: String,
    pub model: String,
}

/// Sends audit prompts to a model endpoint. Stateless; no persistence.
///
/// Every call is bounded by `timeout` regardless of what the endpoint
/// enforces itself; expiry reads as `RemoteUnavailable`.
#[derive(Clone)]
pub struct AuditClient {
    endpoint: Arc<dyn ModelEndpoint>,
    timeout: Duration,
}

impl AuditClient {
    pub fn new(endpoint: Arc<dyn ModelEndpoint>) -> Self {
        Self {
            endpoint,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn request_for(meta: &AppMetadata) -> ModelRequest {
        ModelRequest {
            system_instruction: SYSTEM_PROMPT.to_string(),
            user_content: build_user_prompt(meta),
        }
    }

    pub fn model_name(&self) -> &str {
        self.endpoint.model_name()
    }

    pub async fn audit(&self, meta: &AppMetadata) -> Result<RawReply, RemoteFailure> {
        let request = Self::request_for(meta);
        let started = Instant::now();

        let result = match tokio::time::timeout(self.timeout, self.endpoint.generate(&request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(RemoteFailure::RemoteUnavailable(format!(
                "no reply within {}s",
                self.timeout.as_secs_f64()
            ))),
        };

        match result {
            Ok(text) => {
                tracing::debug!(
                    model = self.model_name(),
                    reply_len = text.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "model replied"
                );
                Ok(RawReply {
                    text,
                    model: self.model_name().to_string(),
                })
            }
            Err(err) => {
                tracing::warn!(
                    model = self.model_name(),
                    category = err.category().as_str(),
                    retryable = err.is_retryable(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "model call failed"
                );
                Err(err)
            }
        }
    }
}
