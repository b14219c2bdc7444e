//! Google Generative Language client
//!
//! Non-streaming `generateContent` calls with a system instruction and one
//! user turn. The API key travels in the `x-goog-api-key` header.
//!
//! Failure mapping:
//! - no key → `ConfigurationMissing`
//! - transport error, timeout, HTTP 5xx, HTTP 429 → `RemoteUnavailable`
//! - other HTTP 4xx, blocked prompt, safety stop, empty text → `RemoteRejected`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::endpoint::{ModelEndpoint, ModelRequest};
use crate::error::RemoteFailure;

/// Google Generative AI API base URL.
pub const GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const DEFAULT_MODEL: &str = "gemini-flash-latest";

pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Configuration for the Gemini endpoint.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Models collection URL; `{api_base}/{model}:generateContent` is called.
    pub api_base: String,
    /// Model to use (e.g., "gemini-flash-latest").
    pub model: String,
    /// Upper bound on one request, connect through body.
    pub timeout: Duration,
    /// `None` makes every call fail with `ConfigurationMissing`.
    pub api_key: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: GOOGLE_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            api_key: None,
        }
    }
}

impl GeminiConfig {
    /// Read the API key from `var`. Unset or blank leaves the key missing.
    pub fn with_key_from_env(mut self, var: &str) -> Self {
        self.api_key = std::env::var(var)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        self
    }
}

/// Google error response format.
#[derive(Debug, Deserialize)]
struct GoogleError {
    code: Option<u16>,
    message: String,
    status: Option<String>,
}

/// Google error wrapper.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Prompt feedback (for blocked prompts).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

/// `ModelEndpoint` backed by the Generative Language REST API.
pub struct GeminiEndpoint {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiEndpoint {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Creates an endpoint with a custom HTTP client.
    pub fn with_client(client: reqwest::Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn api_key(&self) -> Result<&str, RemoteFailure> {
        self.config.api_key.as_deref().ok_or_else(|| {
            RemoteFailure::ConfigurationMissing("no Gemini API key configured".to_string())
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Model names visible to the configured key.
    pub async fn list_models(&self) -> Result<Vec<String>, RemoteFailure> {
        let key = self.api_key()?;
        let response = self
            .client
            .get(self.config.api_base.trim_end_matches('/'))
            .header(API_KEY_HEADER, key)
            .timeout(self.config.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body = response.text().await?;
        let list: ModelList = serde_json::from_str(&body).map_err(|e| {
            RemoteFailure::RemoteRejected {
                status: None,
                message: format!("undecodable model list: {e}"),
            }
        })?;
        Ok(list.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl ModelEndpoint for GeminiEndpoint {
    async fn generate(&self, request: &ModelRequest) -> Result<String, RemoteFailure> {
        let key = self.api_key()?;

        let response = self
            .client
            .post(self.generate_url())
            .header(API_KEY_HEADER, key)
            .timeout(self.config.timeout)
            .json(&build_request_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body = response.text().await?;
        extract_reply_text(&body)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Builds the request body for the Generative AI API.
fn build_request_body(request: &ModelRequest) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": request.system_instruction }]
        },
        "contents": [{
            "role": "user",
            "parts": [{ "text": request.user_content }]
        }]
    })
}

async fn error_from_response(response: reqwest::Response) -> RemoteFailure {
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    classify_status(status, &error_text)
}

fn classify_status(status: StatusCode, error_text: &str) -> RemoteFailure {
    let (code, message) = match serde_json::from_str::<ErrorResponse>(error_text) {
        Ok(error_response) => {
            let err = error_response.error;
            let message = match err.status {
                Some(kind) => format!("{kind}: {}", err.message),
                None => err.message,
            };
            (err.code.unwrap_or(status.as_u16()), message)
        }
        Err(_) => (status.as_u16(), error_text.trim().to_string()),
    };

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        RemoteFailure::RemoteUnavailable(format!("HTTP {code}: {message}"))
    } else {
        RemoteFailure::RemoteRejected {
            status: Some(code),
            message,
        }
    }
}

fn extract_reply_text(body: &str) -> Result<String, RemoteFailure> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| RemoteFailure::RemoteRejected {
            status: None,
            message: format!("undecodable response body: {e}"),
        })?;

    if let Some(reason) = parsed
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return Err(RemoteFailure::RemoteRejected {
            status: None,
            message: format!("prompt blocked: {reason}"),
        });
    }

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return Err(RemoteFailure::RemoteRejected {
            status: None,
            message: "response had no candidates".to_string(),
        });
    };

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(RemoteFailure::RemoteRejected {
            status: None,
            message: "response blocked due to safety concerns".to_string(),
        });
    }

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(RemoteFailure::RemoteRejected {
            status: None,
            message: "empty reply".to_string(),
        });
    }

    Ok(text)
}
