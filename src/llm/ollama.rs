//! Ollama API client implementation.
//!
//! Talks to a local Ollama runtime over its HTTP API. Only the non-streaming
//! chat endpoint is used; schema-constrained requests pass the JSON schema in
//! the `format` field, which Ollama enforces server-side.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::LlmError;
use super::{ChatMessage, ChatOptions, ChatResponse, LlmClient, ModelInfo, TokenUsage, ToolDefinition};

/// Default Ollama endpoint for a local install.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Ollama HTTP API client.
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a client for the given base URL (e.g. `http://127.0.0.1:11434`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        options: ChatOptions,
    ) -> anyhow::Result<ChatResponse> {
        let request = OllamaChatRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            stream: false,
            tools: tools.map(|t| t.to_vec()),
            format: options.format,
            options: options.temperature.map(|temperature| OllamaOptions {
                temperature: Some(temperature),
            }),
        };

        tracing::debug!("Sending chat request to Ollama: model={}", model);

        let response = self
            .client
            .post(self.endpoint("/api/chat"))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Network(format!("Request timeout: {}", e))
                } else if e.is_connect() {
                    LlmError::Network(format!("Connection failed: {}", e))
                } else {
                    LlmError::Network(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), model, body).into());
        }

        let body = response.text().await.unwrap_or_default();
        let parsed: OllamaChatResponse = serde_json::from_str(&body).map_err(|e| {
            let snippet: String = body.chars().take(500).collect();
            LlmError::Parse(format!("{}, body: {}", e, snippet))
        })?;

        let usage = match (parsed.prompt_eval_count, parsed.eval_count) {
            (Some(prompt), Some(completion)) => Some(TokenUsage::new(prompt, completion)),
            _ => None,
        };

        Ok(ChatResponse {
            content: parsed.message.map(|m| m.content),
            model: Some(parsed.model.unwrap_or_else(|| model.to_string())),
            usage,
        })
    }

    async fn list_models(&self) -> anyhow::Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(self.endpoint("/api/tags"))
            .send()
            .await
            .map_err(|e| LlmError::Network(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Service {
                status: status.as_u16(),
                message: body,
            }
            .into());
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(parsed.models)
    }
}

/// Ollama `/api/chat` request format.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

/// Sampling options nested under `options` in the Ollama API.
#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Ollama `/api/chat` response format.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

/// Message in an Ollama chat response.
#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

/// Ollama `/api/tags` response format.
#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}
