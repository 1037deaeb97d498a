//! An individual agent: a named worker bound to one model, one system
//! prompt, and a tool set, with its own append-only memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use crate::agents::schemas::{agent_response_schema, tool_response_schema};
use crate::agents::types::{
    MemoryEntry, TaskResult, ToolCallRequest, ToolResult, SOURCE_EXECUTION, SOURCE_GROUP_MEMORY,
    SOURCE_REASONING, SOURCE_TASK,
};
use crate::llm::{ChatMessage, ChatOptions, LlmClient, ToolDefinition};

/// Sampling temperature for agent task execution. Fixed low so that repeated
/// runs of the same subtask stay close to deterministic.
const AGENT_TEMPERATURE: f32 = 0.2;

/// How many memory entries of each kind are rendered into the prompt.
const MEMORY_WINDOW: usize = 5;

/// Role of an agent within its group.
///
/// Resolved once when the agent is created or renamed; coordination code
/// matches on this field instead of re-comparing the display name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    #[default]
    Worker,
    Manager,
}

impl AgentRole {
    /// Derive the role from a display name ("manager", case-insensitive,
    /// takes the manager role).
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("manager") {
            AgentRole::Manager
        } else {
            AgentRole::Worker
        }
    }
}

/// An addressable worker: identity, bound model, system prompt, tool list,
/// and an append-only memory log.
///
/// Agents are owned by exactly one [`AgentGroup`](crate::agents::AgentGroup)
/// and are resolved by display name at call time; a missing name is a
/// resolution error in the caller's envelope, never a panic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub model: String,
    pub system_prompt: String,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub memory: Vec<MemoryEntry>,
    #[serde(default)]
    pub role: AgentRole,
    /// Retention policy for the memory log. `None` keeps everything for the
    /// agent's lifetime; `Some(n)` keeps the newest `n` entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<usize>,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    /// Create a new agent. The role is resolved from the name once, here.
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        let name = name.into();
        let role = AgentRole::from_name(&name);
        let agent = Self {
            id: Uuid::new_v4(),
            name,
            model: model.into(),
            system_prompt: system_prompt.into(),
            tools,
            memory: Vec::new(),
            role,
            memory_limit: None,
            created_at: Utc::now(),
        };
        tracing::info!(
            "Created new Agent: {} (ID: {}) with model: {}",
            agent.name,
            agent.id,
            agent.model
        );
        agent
    }

    /// Rename the agent, re-resolving its role.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.role = AgentRole::from_name(&self.name);
    }

    /// Append a memory entry with a generated timestamp.
    ///
    /// Applies the retention policy afterwards: with no `memory_limit` the
    /// log grows without bound.
    pub fn add_to_memory(&mut self, content: impl Into<String>, source: &str) {
        self.memory.push(MemoryEntry::new(content, source));
        if let Some(limit) = self.memory_limit {
            if self.memory.len() > limit {
                let excess = self.memory.len() - limit;
                self.memory.drain(..excess);
            }
        }
    }

    /// Look up a tool definition by function name.
    pub fn find_tool(&self, tool_name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.function.name == tool_name)
    }

    /// Build the system prompt for a task: stored prompt, memory context
    /// (group-shared entries first), and the fixed JSON format instructions.
    fn build_system_prompt(&self) -> String {
        let mut system_content = self.system_prompt.clone();

        if !self.memory.is_empty() {
            let group: Vec<&MemoryEntry> = self
                .memory
                .iter()
                .filter(|m| m.source == SOURCE_GROUP_MEMORY)
                .collect();
            let individual: Vec<&MemoryEntry> = self
                .memory
                .iter()
                .filter(|m| m.source != SOURCE_GROUP_MEMORY)
                .collect();

            let mut sections = Vec::new();
            if !group.is_empty() {
                let window = &group[group.len().saturating_sub(MEMORY_WINDOW)..];
                let rendered: Vec<String> =
                    window.iter().map(|m| format!("- {}", m.content)).collect();
                sections.push(format!("Group Shared Context:\n{}", rendered.join("\n")));
            }
            if !individual.is_empty() {
                let window = &individual[individual.len().saturating_sub(MEMORY_WINDOW)..];
                let rendered: Vec<String> =
                    window.iter().map(|m| format!("- {}", m.content)).collect();
                sections.push(format!("My Previous Knowledge:\n{}", rendered.join("\n")));
            }
            if !sections.is_empty() {
                system_content.push_str("\n\n");
                system_content.push_str(&sections.join("\n\n"));
            }
        }

        system_content.push_str(
            "\n\nYou must respond in JSON format according to this schema:\n\
             {\n\
                 \"thought_process\": \"Your reasoning about the task\",\n\
                 \"response\": \"Your final response\"\n\
             }\n\
             Think through your actions first, then list any tools needed, \
             and finally provide your response.",
        );

        system_content
    }

    /// Execute a task using this agent's capabilities.
    ///
    /// All failure paths are captured into the returned envelope: a JSON
    /// parse failure carries the raw model output and records no memory; a
    /// completion-service failure carries the elapsed time. This method
    /// never returns `Err` and never panics.
    pub async fn execute_task(&mut self, client: &dyn LlmClient, task: &str) -> TaskResult {
        tracing::info!(
            "Agent {} (ID: {}) executing task: {:.50}...",
            self.name,
            self.id,
            task
        );

        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(self.build_system_prompt()),
            ChatMessage::user(task),
        ];

        let response = match client
            .chat_completion(
                &self.model,
                &messages,
                if self.tools.is_empty() {
                    None
                } else {
                    Some(&self.tools)
                },
                ChatOptions::schema(AGENT_TEMPERATURE, agent_response_schema()),
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Error when agent {} executed task: {}", self.name, e);
                return TaskResult::error(e.to_string(), start.elapsed().as_millis() as u64);
            }
        };

        let content = response.content_or_empty().to_string();
        let parsed: AgentResponse = match serde_json::from_str(&content) {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::error!("Failed to parse agent response as JSON: {}", content);
                return TaskResult::Error {
                    error: "Failed to parse agent response as JSON".to_string(),
                    raw_content: Some(content),
                    execution_time_ms: start.elapsed().as_millis() as u64,
                };
            }
        };

        self.add_to_memory(format!("Task: {}", task), SOURCE_TASK);
        self.add_to_memory(
            format!("Thought process: {}", parsed.thought_process),
            SOURCE_REASONING,
        );
        self.add_to_memory(format!("Response: {}", parsed.response), SOURCE_EXECUTION);

        tracing::info!("Agent {} completed task successfully", self.name);
        TaskResult::Success {
            thought_process: parsed.thought_process,
            response: parsed.response,
            tool_calls: parsed.tool_calls,
            execution_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Execute a tool by name and validate its structured response.
    ///
    /// A tool missing from the agent's tool list returns an error envelope
    /// immediately, without a completion call.
    pub async fn execute_tool(
        &self,
        client: &dyn LlmClient,
        tool_name: &str,
        input_data: &serde_json::Value,
    ) -> ToolResult {
        tracing::info!("Agent {} executing tool: {}", self.name, tool_name);
        let start = Instant::now();

        if self.find_tool(tool_name).is_none() {
            return ToolResult::Error {
                error: format!("Tool {} not found in agent's tools", tool_name),
                execution_time_ms: start.elapsed().as_millis() as u64,
            };
        }

        let payload = serde_json::json!({ "tool": tool_name, "input": input_data });
        let messages = vec![
            ChatMessage::system(
                "Execute the tool and return results in JSON format according to the schema.",
            ),
            ChatMessage::user(payload.to_string()),
        ];

        let response = match client
            .chat_completion(
                &self.model,
                &messages,
                None,
                ChatOptions {
                    temperature: None,
                    format: Some(tool_response_schema()),
                },
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Error executing tool {}: {}", tool_name, e);
                return ToolResult::Error {
                    error: e.to_string(),
                    execution_time_ms: start.elapsed().as_millis() as u64,
                };
            }
        };

        let content = response.content_or_empty();
        match serde_json::from_str::<ToolResponse>(content) {
            Ok(parsed) if parsed.status == "success" => ToolResult::Success {
                result: parsed.result,
                execution_time_ms: start.elapsed().as_millis() as u64,
            },
            Ok(parsed) => ToolResult::Error {
                error: parsed
                    .error
                    .unwrap_or_else(|| "Tool execution failed".to_string()),
                execution_time_ms: start.elapsed().as_millis() as u64,
            },
            Err(_) => {
                tracing::error!("Failed to parse tool response as JSON: {}", content);
                ToolResult::Error {
                    error: "Failed to parse tool response as JSON".to_string(),
                    execution_time_ms: start.elapsed().as_millis() as u64,
                }
            }
        }
    }
}

/// Structured response an agent is required to produce for a task.
#[derive(Debug, Deserialize)]
struct AgentResponse {
    thought_process: String,
    response: String,
    #[serde(default)]
    tool_calls: Vec<ToolCallRequest>,
}

/// Structured response for a tool execution.
#[derive(Debug, Deserialize)]
struct ToolResponse {
    status: String,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedClient;
    use crate::llm::FunctionDefinition;

    fn worker(name: &str) -> Agent {
        Agent::new(name, "llama2", "You are a helpful assistant.", vec![])
    }

    fn tool_def(name: &str) -> ToolDefinition {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.to_string(),
                description: format!("The {} tool", name),
                parameters: serde_json::json!({"type": "object"}),
            },
        }
    }

    #[test]
    fn test_role_resolved_from_name() {
        assert_eq!(worker("Alice").role, AgentRole::Worker);
        assert_eq!(worker("manager").role, AgentRole::Manager);
        assert_eq!(worker("MANAGER").role, AgentRole::Manager);

        let mut agent = worker("Alice");
        agent.rename("Manager");
        assert_eq!(agent.role, AgentRole::Manager);
    }

    #[test]
    fn test_memory_limit_evicts_oldest() {
        let mut agent = worker("Alice");
        agent.memory_limit = Some(3);
        for i in 0..5 {
            agent.add_to_memory(format!("entry {}", i), "observation");
        }
        assert_eq!(agent.memory.len(), 3);
        assert_eq!(agent.memory[0].content, "entry 2");
        assert_eq!(agent.memory[2].content, "entry 4");
    }

    #[tokio::test]
    async fn test_execute_task_success_records_memory() {
        let client = ScriptedClient::with_contents(&[
            r#"{"thought_process": "I should greet", "response": "Hello!"}"#,
        ]);
        let mut agent = worker("Alice");

        let result = agent.execute_task(&client, "Say hello").await;
        match result {
            TaskResult::Success {
                thought_process,
                response,
                tool_calls,
                ..
            } => {
                assert_eq!(thought_process, "I should greet");
                assert_eq!(response, "Hello!");
                assert!(tool_calls.is_empty());
            }
            other => panic!("expected success, got {:?}", other),
        }

        let sources: Vec<&str> = agent.memory.iter().map(|m| m.source.as_str()).collect();
        assert_eq!(sources, vec![SOURCE_TASK, SOURCE_REASONING, SOURCE_EXECUTION]);
    }

    #[tokio::test]
    async fn test_execute_task_parse_failure_keeps_raw_content() {
        let client = ScriptedClient::with_contents(&["not json at all"]);
        let mut agent = worker("Alice");

        let result = agent.execute_task(&client, "Say hello").await;
        match result {
            TaskResult::Error {
                error, raw_content, ..
            } => {
                assert_eq!(error, "Failed to parse agent response as JSON");
                assert_eq!(raw_content.as_deref(), Some("not json at all"));
            }
            other => panic!("expected error, got {:?}", other),
        }
        // No memory is recorded on the parse-failure path.
        assert!(agent.memory.is_empty());
    }

    #[tokio::test]
    async fn test_execute_task_never_raises_on_service_failure() {
        let client = ScriptedClient::failing("connection refused");
        let mut agent = worker("Alice");

        let result = agent.execute_task(&client, "Say hello").await;
        match result {
            TaskResult::Error {
                error, raw_content, ..
            } => {
                assert!(error.contains("connection refused"));
                assert!(raw_content.is_none());
            }
            other => panic!("expected error, got {:?}", other),
        }
        assert!(agent.memory.is_empty());
    }

    #[tokio::test]
    async fn test_execute_tool_unknown_name_short_circuits() {
        // No scripted responses: a completion call would fail the test.
        let client = ScriptedClient::new();
        let mut agent = worker("Alice");
        agent.tools = vec![tool_def("calculator")];

        let result = agent
            .execute_tool(&client, "missing_tool", &serde_json::json!({}))
            .await;
        match result {
            ToolResult::Error { error, .. } => {
                assert!(error.contains("missing_tool"));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_tool_success() {
        let client = ScriptedClient::with_contents(&[
            r#"{"status": "success", "result": {"value": 42}}"#,
        ]);
        let mut agent = worker("Alice");
        agent.tools = vec![tool_def("calculator")];

        let result = agent
            .execute_tool(&client, "calculator", &serde_json::json!({"expr": "6*7"}))
            .await;
        match result {
            ToolResult::Success { result, .. } => {
                assert_eq!(result.unwrap()["value"], 42);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }
}
