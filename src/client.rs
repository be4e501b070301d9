//! Model client
//!
//! One network round-trip per call: send a prompt, get the raw completion text
//! back. Failures surface as [`ModelError`]; nothing is retried.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::Config;
use crate::log_debug;
use crate::providers::{Provider, ProviderConfig, ProviderError};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_ERROR_BODY_CHARS: usize = 500;

/// A single text-completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Output MIME type hint, honoured by providers that support one
    pub response_mime_type: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_mime_type: None,
        }
    }

    /// Ask the provider for plain text rather than JSON or markdown-heavy output
    pub fn plain_text(mut self) -> Self {
        self.response_mime_type = Some("text/plain".to_string());
        self
    }
}

/// Errors raised at the model-service boundary
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} API request failed with status {status}: {body}")]
    Status {
        provider: Provider,
        status: StatusCode,
        body: String,
    },
    #[error("Failed to extract content from {provider} API response")]
    MalformedResponse { provider: Provider },
    #[error("{provider} did not respond within {} seconds", .timeout.as_secs())]
    Timeout {
        provider: Provider,
        timeout: Duration,
    },
}

/// Text-completion service used by the orchestrator
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError>;
}

/// HTTP client for a hosted LLM provider.
///
/// Built once at startup and shared read-only between requests. Holds the API
/// key, so it is intentionally not `Debug`.
#[derive(Clone)]
pub struct ModelClient {
    client: Client,
    provider: Provider,
    model: String,
    api_key: String,
    base_url: String,
    max_output_tokens: u32,
    additional_params: HashMap<String, String>,
    timeout: Duration,
}

impl ModelClient {
    pub fn new(
        provider: Provider,
        provider_config: &ProviderConfig,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            provider,
            model: provider_config.effective_model(provider).to_string(),
            api_key: api_key.into(),
            base_url: provider_config.effective_base_url(provider).to_string(),
            max_output_tokens: provider_config.effective_max_output_tokens(),
            additional_params: provider_config.additional_params.clone(),
            timeout,
        }
    }

    /// Build a client for the configured provider, or report why it cannot be built
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let provider = config.provider()?;
        let api_key = config.credential()?;
        let provider_config = config.active_provider_config()?;
        Ok(Self::new(
            provider,
            &provider_config,
            api_key,
            config.request_timeout(),
        ))
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: &GenerationRequest) -> RequestBuilder {
        match self.provider {
            Provider::Google => {
                let mut body = json!({
                    "contents": [
                        {
                            "role": "user",
                            "parts": [{"text": request.prompt}]
                        }
                    ],
                    "generationConfig": {
                        "maxOutputTokens": self.max_output_tokens
                    }
                });
                for (key, value) in &self.additional_params {
                    body["generationConfig"][key] = param_value(value);
                }
                if let Some(mime) = &request.response_mime_type {
                    body["generationConfig"]["response_mime_type"] = json!(mime);
                }

                self.client
                    .post(format!(
                        "{}/models/{}:generateContent",
                        self.base_url, self.model
                    ))
                    .query(&[("key", self.api_key.as_str())])
                    .json(&body)
            }
            Provider::OpenAI => {
                let mut body = json!({
                    "model": self.model,
                    "messages": [{"role": "user", "content": request.prompt}],
                    "max_tokens": self.max_output_tokens
                });
                for (key, value) in &self.additional_params {
                    body[key] = param_value(value);
                }

                self.client
                    .post(format!("{}/chat/completions", self.base_url))
                    .bearer_auth(&self.api_key)
                    .json(&body)
            }
            Provider::Anthropic => {
                let mut body = json!({
                    "model": self.model,
                    "max_tokens": self.max_output_tokens,
                    "messages": [{"role": "user", "content": request.prompt}]
                });
                for (key, value) in &self.additional_params {
                    body[key] = param_value(value);
                }

                self.client
                    .post(format!("{}/messages", self.base_url))
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&body)
            }
        }
    }

    async fn send(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        let provider = self.provider;
        // Gemini URLs carry the key as a query parameter
        let response = self
            .build_request(request)
            .send()
            .await
            .map_err(|source| ModelError::Transport {
                provider,
                source: source.without_url(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                provider,
                status,
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|source| ModelError::Transport {
                provider,
                source: source.without_url(),
            })?;

        extract_text(provider, &body).ok_or(ModelError::MalformedResponse { provider })
    }
}

#[async_trait]
impl LanguageModel for ModelClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        log_debug!(
            "Sending {} char prompt to {} ({})",
            request.prompt.len(),
            self.provider,
            self.model
        );

        match tokio::time::timeout(self.timeout, self.send(request)).await {
            Ok(Ok(text)) => {
                log_debug!("Received {} chars from {}", text.len(), self.provider);
                Ok(text)
            }
            Ok(Err(e)) => {
                log_debug!("Provider error: {}", e);
                Err(e)
            }
            Err(_) => {
                log_debug!("Provider timed out after {:?}", self.timeout);
                Err(ModelError::Timeout {
                    provider: self.provider,
                    timeout: self.timeout,
                })
            }
        }
    }
}

/// Numbers go out as JSON numbers, everything else as strings
fn param_value(value: &str) -> Value {
    value
        .parse::<f64>()
        .map_or_else(|_| json!(value), |num| json!(num))
}

/// Pull the completion text out of a provider response body
fn extract_text(provider: Provider, body: &Value) -> Option<String> {
    match provider {
        // { "candidates": [ { "content": { "parts": [ { "text": "..." } ] } } ] }
        Provider::Google => join_text_parts(body["candidates"][0]["content"]["parts"].as_array()?),
        // { "choices": [ { "message": { "content": "..." } } ] }
        Provider::OpenAI => body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string),
        // { "content": [ { "type": "text", "text": "..." } ] }
        Provider::Anthropic => join_text_parts(body["content"].as_array()?),
    }
}

fn join_text_parts(parts: &[Value]) -> Option<String> {
    let texts: Vec<&str> = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.concat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_gemini_text() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "world"}]}}]
        });
        assert_eq!(
            extract_text(Provider::Google, &body).as_deref(),
            Some("Hello world")
        );
    }

    #[test]
    fn test_extract_openai_and_anthropic_text() {
        let openai = json!({"choices": [{"message": {"content": "answer"}}]});
        assert_eq!(
            extract_text(Provider::OpenAI, &openai).as_deref(),
            Some("answer")
        );

        let anthropic = json!({"content": [{"type": "text", "text": "reply"}]});
        assert_eq!(
            extract_text(Provider::Anthropic, &anthropic).as_deref(),
            Some("reply")
        );
    }

    #[test]
    fn test_extract_rejects_unexpected_shape() {
        assert!(extract_text(Provider::Google, &json!({"candidates": []})).is_none());
        assert!(extract_text(Provider::OpenAI, &json!({"error": "nope"})).is_none());
    }

    #[test]
    fn test_param_value_types() {
        assert_eq!(param_value("0.2"), json!(0.2));
        assert_eq!(param_value("text/plain"), json!("text/plain"));
    }

    #[test]
    fn test_plain_text_request() {
        let request = GenerationRequest::new("refactor this").plain_text();
        assert_eq!(request.response_mime_type.as_deref(), Some("text/plain"));
    }
}
