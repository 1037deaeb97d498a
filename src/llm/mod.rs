//! Completion-service client module.
//!
//! Provides a trait-based abstraction over chat-completion backends, with the
//! local Ollama runtime as the primary implementation. The orchestration core
//! only ever issues non-streaming, schema-constrained requests: when a JSON
//! schema is supplied via [`ChatOptions::format`], the backend is expected to
//! return message content that parses as JSON conforming to that schema.

mod error;
mod ollama;

pub use error::LlmError;
pub use ollama::{OllamaClient, DEFAULT_OLLAMA_URL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role in a chat conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Tool definition passed through to the model.
///
/// Tool definitions are opaque to the orchestration core beyond
/// `function.name` and `function.description`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type", default = "default_tool_type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

fn default_tool_type() -> String {
    "function".to_string()
}

/// Function definition with a JSON-schema parameter object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

/// Optional parameters for chat completions.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Sampling temperature (low values favor determinism).
    pub temperature: Option<f32>,
    /// JSON schema constraining the response content.
    pub format: Option<serde_json::Value>,
}

impl ChatOptions {
    /// Options with a fixed temperature and a JSON-schema constraint.
    pub fn schema(temperature: f32, format: serde_json::Value) -> Self {
        Self {
            temperature: Some(temperature),
            format: Some(format),
        }
    }
}

/// Response from a chat completion.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub model: Option<String>,
    pub usage: Option<TokenUsage>,
}

impl ChatResponse {
    /// The message content, or an empty JSON object when the backend
    /// returned none. Schema-constrained callers parse this directly.
    pub fn content_or_empty(&self) -> &str {
        self.content.as_deref().unwrap_or("{}")
    }
}

/// Token usage information, if the backend reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// A locally installed model, as reported by the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

/// Trait for completion-service clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a non-streaming chat completion request.
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        options: ChatOptions,
    ) -> anyhow::Result<ChatResponse>;

    /// List the models installed on the runtime.
    async fn list_models(&self) -> anyhow::Result<Vec<ModelInfo>> {
        Ok(Vec::new())
    }
}
