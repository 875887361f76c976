//! OpenAI-compatible chat completions backend.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::backend::LlmBackend;
use crate::config::{DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE, LlmConfig};
use crate::conversation::{ChatMessage, Conversation};
use crate::error::BackendError;

/// Longest error body echoed into a [`BackendError`].
const MAX_ERROR_BODY: usize = 200;

/// Posts conversations to `{base_url}/chat/completions`.
#[derive(Clone)]
pub struct HttpChatBackend {
    name: String,
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl HttpChatBackend {
    /// Create a backend for `model`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unavailable` if the HTTP client cannot be built.
    pub fn new(
        base_url: impl AsRef<str>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        let model = model.into();

        Ok(Self {
            name: format!("http:{model}"),
            http,
            endpoint: format!("{}/chat/completions", base_url.as_ref().trim_end_matches('/')),
            api_key: None,
            model,
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        })
    }

    /// One backend per configured model, primary first.
    pub fn from_config(config: &LlmConfig) -> Vec<Result<Self, BackendError>> {
        config
            .models()
            .into_iter()
            .map(|model| {
                let backend = Self::new(&config.base_url, model, config.timeout)?
                    .with_temperature(config.temperature)
                    .with_max_output_tokens(config.max_output_tokens);
                Ok(match config.api_key.as_deref() {
                    Some(key) => backend.with_api_key(key),
                    None => backend,
                })
            })
            .collect()
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmBackend for HttpChatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn availability(&self) -> Result<(), BackendError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(()),
            _ => Err(BackendError::Unavailable(format!(
                "no API key configured for {}",
                self.name
            ))),
        }
    }

    async fn send(&self, conversation: &Conversation) -> Result<String, BackendError> {
        let body = ChatRequest {
            model: &self.model,
            messages: conversation.messages(),
            temperature: self.temperature,
            max_tokens: self.max_output_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!(
            backend = %self.name,
            url = %self.endpoint,
            messages = conversation.len(),
            "Sending chat completion request"
        );

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Transport(format!("malformed response body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BackendError::Transport("response contained no message content".into()))
    }
}

fn status_error(status: StatusCode, body: &str) -> BackendError {
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    match status {
        StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimited(format!("HTTP {status}: {body}")),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            BackendError::Unavailable(format!("credentials rejected (HTTP {status}): {body}"))
        }
        _ => BackendError::Transport(format!("HTTP {status}: {body}")),
    }
}
