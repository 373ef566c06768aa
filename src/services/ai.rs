//! Model-call adapter: sends one prompt to a chat-completion provider and
//! returns the first answer, retrying while the provider rate limits us.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rand::{thread_rng, Rng};
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, warn};

use crate::error::{GradeError, GradeResult};
use crate::services::ai_types::{ChatCompletionRequest, ChatCompletionResponse};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4";

const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const MAX_JITTER_MS: u64 = 200;
const ERROR_SNIPPET_CHARS: usize = 400;

/// Anything that can turn a prompt into a completion.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> GradeResult<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Wait the same delay before every retry.
    #[default]
    Fixed,
    /// Double the delay on each retry, with a little jitter.
    Exponential,
}

impl FromStr for Backoff {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Backoff::Fixed),
            "exponential" => Ok(Backoff::Exponential),
            other => Err(format!("unknown backoff strategy: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    /// How long to wait before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => {
                let factor = 2_u32.saturating_pow(retry.saturating_sub(1));
                let jitter = Duration::from_millis(thread_rng().gen_range(0..=MAX_JITTER_MS));
                self.delay
                    .saturating_mul(factor)
                    .saturating_add(jitter)
                    .min(MAX_BACKOFF)
            }
        }
    }
}

/// Everything the adapter needs to reach the provider.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }
}

impl AiConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.api_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Chat-completion client for OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    client: Client,
    config: AiConfig,
}

impl ChatCompletionClient {
    pub fn new(config: AiConfig) -> GradeResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GradeError::ProviderCallFailed {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    async fn complete_once(&self, body: &ChatCompletionRequest<'_>) -> GradeResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| GradeError::ProviderCallFailed {
                message: "no API key configured for model provider".into(),
            })?;

        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GradeError::RateLimited);
        }

        // Read as text first so an error body is not lost when JSON decoding fails.
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(GradeError::ProviderCallFailed {
                message: extract_error_message(status, &text),
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| GradeError::ProviderCallFailed {
                message: format!("invalid JSON from model provider: {e}"),
            })?;

        parsed
            .first_content()
            .map(|c| c.trim().to_string())
            .ok_or(GradeError::NoCompletionReturned)
    }
}

#[async_trait]
impl CompletionModel for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> GradeResult<String> {
        info!(
            model = %self.config.model,
            prompt_chars = prompt.chars().count(),
            "calling model provider"
        );
        debug!(prompt = %prompt, "prompt");

        let body = ChatCompletionRequest::single_user(&self.config.model, prompt);
        let policy = &self.config.retry;
        let mut retries = 0u32;

        loop {
            match self.complete_once(&body).await {
                Ok(content) => {
                    info!(
                        response_chars = content.chars().count(),
                        retries, "model response received"
                    );
                    debug!(response = %content, "model response");
                    return Ok(content);
                }
                Err(GradeError::RateLimited) if retries < policy.max_retries => {
                    retries += 1;
                    let delay = policy.delay_for(retries);
                    warn!(
                        retry = retries,
                        max_retries = policy.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "rate limited by model provider, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(GradeError::RateLimited) => {
                    let err = GradeError::RateLimitExceeded {
                        attempts: retries + 1,
                    };
                    error!(error = %err, "giving up on model provider");
                    return Err(err);
                }
                Err(e) => {
                    error!(error = %e, "model provider call failed");
                    return Err(e);
                }
            }
        }
    }
}

fn extract_error_message(status: StatusCode, body_text: &str) -> String {
    // Common shapes: { "error": { "message": "..." } } or { "message": "..." }
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body_text) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
        if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
    }

    let trimmed = body_text.trim();
    let snippet = if trimmed.chars().count() > ERROR_SNIPPET_CHARS {
        let cut: String = trimmed.chars().take(ERROR_SNIPPET_CHARS).collect();
        format!("{cut}...")
    } else {
        trimmed.to_string()
    };

    format!("HTTP {}: {}", status.as_u16(), snippet)
}
