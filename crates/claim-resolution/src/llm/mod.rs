//! Language-model gateway.
//!
//! The engine only ever asks for a single text completion; everything it needs from a
//! provider fits in [`CompletionRequest`]. Classification and scoring calls run at low
//! temperature and must answer with one JSON object, which [`validate`] turns into typed
//! results or rejects.

mod openai;
pub mod validate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::OpenAiCompatibleClient;
pub use validate::{extract_json_object, parse_json_response, ValidationError};

/// Single-shot completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            prompt: prompt.into(),
            temperature: 0.1,
            max_tokens: 2_000,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: TokenUsage,
}

/// Narrow interface over whatever reasoning service is configured.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("language model is not configured: {0}")]
    NotConfigured(String),
    #[error("language model authentication failed: {0}")]
    Authentication(String),
    #[error("language model rate limited: {0}")]
    RateLimited(String),
    #[error("language model rejected the request: {0}")]
    InvalidRequest(String),
    #[error("language model server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("language model request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("language model transport error: {0}")]
    Transport(String),
    #[error("language model returned an empty completion")]
    EmptyCompletion,
}

impl LlmError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited(_)
                | LlmError::Server { .. }
                | LlmError::Timeout(_)
                | LlmError::Transport(_)
        )
    }
}

/// Maps an HTTP failure status to the gateway error taxonomy.
pub fn classify_http_error(status: u16, body: &str) -> LlmError {
    match status {
        401 | 403 => LlmError::Authentication(body.to_string()),
        429 => LlmError::RateLimited(body.to_string()),
        400 | 404 | 422 => LlmError::InvalidRequest(body.to_string()),
        _ => LlmError::Server {
            status,
            message: body.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_errors_map_to_taxonomy() {
        assert!(matches!(
            classify_http_error(401, "bad key"),
            LlmError::Authentication(_)
        ));
        assert!(matches!(
            classify_http_error(429, "slow down"),
            LlmError::RateLimited(_)
        ));
        assert!(matches!(
            classify_http_error(503, "overloaded"),
            LlmError::Server { status: 503, .. }
        ));
        assert!(matches!(
            classify_http_error(400, "bad body"),
            LlmError::InvalidRequest(_)
        ));
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(LlmError::RateLimited("x".into()).is_retryable());
        assert!(LlmError::Timeout(std::time::Duration::from_secs(1)).is_retryable());
        assert!(!LlmError::Authentication("x".into()).is_retryable());
        assert!(!LlmError::EmptyCompletion.is_retryable());
    }

    #[test]
    fn request_builder_overrides_defaults() {
        let request = CompletionRequest::new("system", "prompt")
            .temperature(0.3)
            .max_tokens(8_000);
        assert_eq!(request.temperature, 0.3);
        assert_eq!(request.max_tokens, 8_000);
        assert_eq!(request.system_prompt, "system");
    }
}
