//! Client for OpenAI-compatible chat-completion servers.
//!
//! Targets LM Studio by default, but works with any server exposing
//! `/chat/completions` and `/models`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{FxLensError, Result};
use crate::llm::types::{CompletionOptions, Message};
use crate::llm::LlmClient;

const MAX_RETRY_ATTEMPTS: u32 = 2;

const RETRY_BASE_DELAY_MS: u64 = 1000;

const HEALTH_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL without the `/chat/completions` suffix.
    pub base_url: String,
    pub model: String,
    /// Sent as a bearer token when present. LM Studio needs none.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            timeout_secs: LlmConfig::default().timeout_secs,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.base_url)
    }
}

impl From<&LlmConfig> for OpenAiConfig {
    fn from(config: &LlmConfig) -> Self {
        let mut converted = Self::new(&config.base_url, &config.model)
            .with_timeout(config.timeout_secs);
        converted.api_key = config.api_key.clone().filter(|key| !key.is_empty());
        converted
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FxLensError::llm(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Maps an error response to (error, retryable).
    fn parse_error(status: StatusCode, body: &str) -> (FxLensError, bool) {
        if status == StatusCode::UNAUTHORIZED {
            return (
                FxLensError::llm("Authentication failed. Check the Atlas API key."),
                false,
            );
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return (FxLensError::llm("Rate limited by the Atlas endpoint."), true);
        }

        let retryable = status.is_server_error();
        if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
            return (
                FxLensError::llm(format!("Atlas endpoint error: {}", error_response.error.message)),
                retryable,
            );
        }

        (
            FxLensError::llm(format!("Atlas endpoint error ({status}): {body}")),
            retryable,
        )
    }

    fn map_request_error(&self, error: &reqwest::Error) -> FxLensError {
        if error.is_timeout() {
            FxLensError::llm(format!(
                "Atlas timed out after {} seconds",
                self.config.timeout_secs
            ))
        } else if error.is_connect() {
            FxLensError::llm(format!(
                "Cannot reach Atlas at {}. Is LM Studio running?",
                self.config.base_url
            ))
        } else {
            FxLensError::llm(format!("Atlas request failed: {error}"))
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message], options: CompletionOptions) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: false,
        };

        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let mut attempt = 1;
        loop {
            debug!("Atlas request attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let (error, retryable) = match self
                .request(self.client.post(self.config.completions_url()))
                .json(&request)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .map_err(|e| FxLensError::llm(format!("Failed to read response: {e}")))?;

                    if status.is_success() {
                        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
                            FxLensError::llm(format!("Unexpected Atlas response: {e}"))
                        })?;
                        return parsed
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|choice| choice.message.content)
                            .ok_or_else(|| FxLensError::llm("Atlas returned no choices"));
                    }
                    Self::parse_error(status, &body)
                }
                Err(e) => (self.map_request_error(&e), e.is_connect()),
            };

            if !retryable || attempt >= MAX_RETRY_ATTEMPTS {
                return Err(error);
            }
            warn!(
                "Atlas request failed (attempt {}), retrying in {:?}: {}",
                attempt, delay, error
            );
            tokio::time::sleep(delay).await;
            delay *= 2;
            attempt += 1;
        }
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .request(self.client.get(self.config.models_url()))
            .timeout(Duration::from_secs(HEALTH_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| self.map_request_error(&e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(FxLensError::llm(format!(
                "Atlas health check failed with {status}"
            )))
        }
    }

    fn describe(&self) -> String {
        format!("{} @ {}", self.config.model, self.config.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
