//! Concrete `LLMProvider` implementations: OpenAI- and Anthropic-compatible
//! chat-completions clients, plus a null provider (facades degrade to their
//! deterministic pre-pass only) and a fake provider for tests.

use async_trait::async_trait;
use serde_json::json;

use super::{ChatCompletion, ChatMessage, ChatOptions, LLMProvider};
use crate::error::{Result, ServerError};

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<ChatCompletion> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServerError::Internal(format!("openai request failed: {e}")))?;

        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServerError::Internal(format!("openai response was not JSON: {e}")))?;
        if !status.is_success() {
            return Err(ServerError::Internal(format!(
                "openai returned {status}: {payload}"
            )));
        }

        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ServerError::Internal("openai response missing message content".into()))?
            .to_string();
        Ok(ChatCompletion { content })
    }
}

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<ChatCompletion> {
        let body = json!({
            "model": self.model,
            "max_tokens": options.max_tokens.unwrap_or(1024),
            "temperature": options.temperature,
            "messages": messages,
        });
        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| ServerError::Internal(format!("anthropic request failed: {e}")))?;

        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServerError::Internal(format!("anthropic response was not JSON: {e}")))?;
        if !status.is_success() {
            return Err(ServerError::Internal(format!(
                "anthropic returned {status}: {payload}"
            )));
        }

        let content = payload
            .pointer("/content/0/text")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ServerError::Internal("anthropic response missing content text".into()))?
            .to_string();
        Ok(ChatCompletion { content })
    }
}

/// Used when no provider API key is configured: analysis facades still run
/// their deterministic pre-passes, but any step depending on the LLM fails
/// with a precondition error rather than a confusing network failure.
pub struct NullLlmProvider;

impl NullLlmProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMProvider for NullLlmProvider {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn chat(&self, _messages: &[ChatMessage], _options: &ChatOptions) -> Result<ChatCompletion> {
        Err(ServerError::PreconditionFailed(
            "no LLM provider configured: set OPENAI_API_KEY or ANTHROPIC_API_KEY".to_string(),
        ))
    }
}

/// Test double returning a fixed completion, used by analysis facade tests.
pub struct FakeLlmProvider {
    pub response: String,
}

impl FakeLlmProvider {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl LLMProvider for FakeLlmProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn chat(&self, _messages: &[ChatMessage], _options: &ChatOptions) -> Result<ChatCompletion> {
        Ok(ChatCompletion {
            content: self.response.clone(),
        })
    }
}
