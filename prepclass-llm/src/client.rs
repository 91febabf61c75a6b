//! Generation client for the OpenAI-compatible chat-completion API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{GenError, from_status};
use crate::prompt::PromptRequest;

/// Default completion endpoint base.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default hard timeout for one completion call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Explicit client configuration, passed in at construction time.
///
/// There is deliberately no global state here: the API key arrives as a
/// constructor argument, loaded from the environment by the caller.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (no trailing path).
    pub base_url: String,
    /// Bearer API key.
    pub api_key: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Hard timeout per attempt.
    pub timeout: Duration,
    /// Max retries for transient failures. Zero means fail on first error.
    pub max_retries: u32,
}

impl ClientConfig {
    /// Config with the default endpoint, timeout (60 s) and no retries.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: 0,
        }
    }

    /// Override the endpoint base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the transient retry cap.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Anything that can answer a rendered prompt with generated text.
///
/// The HTTP client implements this; tests substitute mocks.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Generate text for one prompt.
    ///
    /// # Errors
    ///
    /// Returns a [`GenError`] describing the failure; implementations
    /// must not swallow any failure kind.
    async fn complete(&self, prompt: &PromptRequest) -> Result<String, GenError>;
}

/// HTTP client for the completion API.
///
/// One outbound call per [`generate`](Self::generate); dropping the
/// returned future abandons the in-flight request, and nothing is
/// persisted for an abandoned call.
pub struct GenerationClient {
    config: ClientConfig,
    http: Client,
}

impl GenerationClient {
    /// Create a client from explicit configuration.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    /// Generate text for a prompt.
    ///
    /// Auth, rate-limit, service and parse failures are returned on the
    /// first occurrence. Timeout/network failures are retried up to
    /// `max_retries` times; with the default of zero the first transient
    /// failure is surfaced as-is.
    ///
    /// # Errors
    ///
    /// See [`GenError`] for the taxonomy.
    pub async fn generate(&self, prompt: &PromptRequest) -> Result<String, GenError> {
        if self.config.api_key.trim().is_empty() {
            return Err(GenError::Auth("no API key configured".into()));
        }

        let url = completions_url(&self.config.base_url);
        let body = request_body(&self.config.model, prompt);

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            if attempt > 1 {
                debug!(
                    attempt,
                    max_attempts = self.config.max_retries + 1,
                    "retrying completion call"
                );
            }

            let start = Instant::now();
            match self.send_once(&url, &body).await {
                Ok(text) => {
                    debug!(
                        latency_ms = start.elapsed().as_millis() as u64,
                        chars = text.len(),
                        model = %self.config.model,
                        "completion succeeded"
                    );
                    return Ok(text);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt > self.config.max_retries => {
                    return if self.config.max_retries == 0 {
                        Err(e)
                    } else {
                        Err(GenError::RetriesExhausted {
                            attempts: attempt,
                            last_error: e.to_string(),
                        })
                    };
                }
                Err(e) => {
                    warn!(error = %e, attempt, "transient completion failure");
                }
            }
        }
    }

    async fn send_once(&self, url: &str, body: &Value) -> Result<String, GenError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenError::Timeout(self.config.timeout.as_millis() as u64)
                } else {
                    GenError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "completion service returned error");
            return Err(from_status(status, message));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| GenError::Parse(e.to_string()))?;

        extract_text(&json)
    }
}

#[async_trait]
impl CompletionService for GenerationClient {
    async fn complete(&self, prompt: &PromptRequest) -> Result<String, GenError> {
        self.generate(prompt).await
    }
}

/// The chat-completions endpoint for a base URL.
fn completions_url(base_url: &str) -> String {
    format!("{}/v1/chat/completions", base_url.trim_end_matches('/'))
}

/// The JSON body for one chat-completion call.
fn request_body(model: &str, prompt: &PromptRequest) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": prompt.system },
            { "role": "user", "content": prompt.user },
        ],
        "max_tokens": prompt.max_tokens,
        "temperature": prompt.temperature,
    })
}

/// Pull the generated text out of a success response body.
fn extract_text(json: &Value) -> Result<String, GenError> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| GenError::Parse("missing choices[0].message.content".into()))
}
