use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{classify_http_error, Completion, CompletionRequest, LanguageModel, LlmError, TokenUsage};
use crate::config::LlmConfig;

const BASE_BACKOFF: Duration = Duration::from_millis(500);

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
    max_retries: u32,
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatibleClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout: config.timeout,
            max_retries: config.max_retries,
        })
    }

    fn request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        json!({
            "model": self.model,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.prompt },
            ],
        })
    }

    async fn attempt(&self, body: &serde_json::Value) -> Result<Completion, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::NotConfigured("LLM_API_KEY is not set".to_string()))?;

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmError::Timeout(self.timeout)
                } else {
                    LlmError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_error(status.as_u16(), &body));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        completion_from_response(payload, &self.model)
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let body = self.request_body(&request);
        let mut retries = 0;

        loop {
            match self.attempt(&body).await {
                Ok(completion) => {
                    debug!(
                        model = %completion.model,
                        prompt_tokens = completion.usage.prompt_tokens,
                        completion_tokens = completion.usage.completion_tokens,
                        "language model completion received"
                    );
                    return Ok(completion);
                }
                Err(err) if err.is_retryable() && retries < self.max_retries => {
                    retries += 1;
                    let delay = BASE_BACKOFF * 2u32.pow(retries - 1);
                    warn!(error = %err, retries, ?delay, "retrying language model call");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

fn completion_from_response(
    payload: ChatResponse,
    fallback_model: &str,
) -> Result<Completion, LlmError> {
    let text = payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(LlmError::EmptyCompletion)?;

    let usage = payload
        .usage
        .map(|usage| TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
        .unwrap_or_default();

    Ok(Completion {
        text,
        model: payload
            .model
            .unwrap_or_else(|| fallback_model.to_string()),
        usage,
    })
}
