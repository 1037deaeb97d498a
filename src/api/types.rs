//! Request and response types for the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::AgentGroup;
use crate::llm::ToolDefinition;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub ollama_url: String,
    pub persistent_store: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Group listing row: identity plus counts, without the full graph.
#[derive(Debug, Serialize)]
pub struct GroupSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub agent_count: usize,
    pub history_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&AgentGroup> for GroupSummary {
    fn from(group: &AgentGroup) -> Self {
        Self {
            id: group.id,
            name: group.name.clone(),
            description: group.description.clone(),
            agent_count: group.agents.len(),
            history_count: group.history.len(),
            created_at: group.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    pub name: String,
    /// Defaults to the configured default model when omitted.
    #[serde(default)]
    pub model: Option<String>,
    pub system_prompt: String,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub memory_limit: Option<usize>,
}

/// Partial agent update; omitted fields are left unchanged. Renaming
/// re-resolves the agent's role.
#[derive(Debug, Deserialize)]
pub struct UpdateAgentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub tools: Option<Vec<ToolDefinition>>,
    /// `Some(None)` clears the retention limit; omitted leaves it unchanged.
    #[serde(default, with = "double_option")]
    pub memory_limit: Option<Option<usize>>,
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<usize>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<usize>::deserialize(deserializer).map(Some)
    }
}

#[derive(Debug, Deserialize)]
pub struct SharedMemoryRequest {
    pub content: String,
    #[serde(default = "default_memory_source")]
    pub source: String,
}

fn default_memory_source() -> String {
    "user".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ExecuteTaskRequest {
    pub task: String,
    /// When set, toggles continuation-chain tracking for this group's
    /// session before the task runs.
    #[serde(default)]
    pub track_chain: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteAgentRequest {
    pub agent: String,
    pub task: String,
    #[serde(default)]
    pub track_chain: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteMultiRequest {
    /// Agents to fan out to. When empty, agents carried over from a prepared
    /// continuation are used.
    #[serde(default)]
    pub agents: Vec<String>,
    pub task: String,
    #[serde(default)]
    pub track_chain: Option<bool>,
}
