//! Core types for the multi-agent system.
//!
//! Every public operation in this crate returns a tagged result envelope
//! rather than a `Result`: failures from the completion service, from JSON
//! parsing, and from agent-name resolution are all folded into the `Error`
//! variant so that no error crosses an orchestration boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in an agent's memory or a group's shared memory.
///
/// Append-only during normal operation. The `source` tag records where the
/// entry came from (`task`, `reasoning`, `execution`, `group_memory`,
/// `manager`, `self_reflection`, `agent_<name>`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryEntry {
    pub content: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Memory source tag for entries copied from group shared memory.
pub const SOURCE_GROUP_MEMORY: &str = "group_memory";
/// Memory source tag for the original task text.
pub const SOURCE_TASK: &str = "task";
/// Memory source tag for the model's reasoning.
pub const SOURCE_REASONING: &str = "reasoning";
/// Memory source tag for the final response.
pub const SOURCE_EXECUTION: &str = "execution";
/// Memory source tag for manager planning/summary notes.
pub const SOURCE_MANAGER: &str = "manager";
/// Memory source tag for an agent's post-task reflection.
pub const SOURCE_SELF_REFLECTION: &str = "self_reflection";

/// A tool invocation requested by an agent in its structured response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub tool: String,
    pub input: serde_json::Value,
}

/// Result of a single agent executing a task.
///
/// Serializes with a `status` tag so the envelope shape matches the wire
/// contract: `{"status": "success", ...}` or `{"status": "error", ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskResult {
    Success {
        thought_process: String,
        response: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
        execution_time_ms: u64,
    },
    Error {
        error: String,
        /// Raw model output, kept for diagnosis when JSON parsing failed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_content: Option<String>,
        execution_time_ms: u64,
    },
}

impl TaskResult {
    /// Create an error envelope without raw content.
    pub fn error(message: impl Into<String>, execution_time_ms: u64) -> Self {
        TaskResult::Error {
            error: message.into(),
            raw_content: None,
            execution_time_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success { .. })
    }

    /// The response text on success, or the error message.
    pub fn response_text(&self) -> &str {
        match self {
            TaskResult::Success { response, .. } => response,
            TaskResult::Error { error, .. } => error,
        }
    }
}

/// Result of executing a tool through an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResult {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
        execution_time_ms: u64,
    },
    Error {
        error: String,
        execution_time_ms: u64,
    },
}

/// A manager-authored execution plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlan {
    pub thought_process: String,
    pub steps: Vec<PlanStep>,
}

/// One step in a manager plan: a subtask assigned to a named agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub agent: String,
    pub task: String,
    #[serde(default)]
    pub reason: String,
}

/// Outcome of one dispatched plan step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub agent: String,
    pub subtask: String,
    #[serde(default)]
    pub reason: String,
    pub result: TaskResult,
}

/// Overall outcome the manager assigns in its summary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanOutcome {
    Success,
    Partial,
    Failure,
}

/// The manager's final summary of a coordinated execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSummary {
    pub summary: String,
    pub outcome: PlanOutcome,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

/// Result of a manager-coordinated group execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ManagerResult {
    Success {
        plan: TaskPlan,
        results: Vec<StepResult>,
        summary: String,
        outcome: PlanOutcome,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        next_steps: Vec<String>,
        execution_time_ms: u64,
    },
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_content: Option<String>,
        execution_time_ms: u64,
    },
}

impl ManagerResult {
    pub fn error(message: impl Into<String>, execution_time_ms: u64) -> Self {
        ManagerResult::Error {
            error: message.into(),
            raw_content: None,
            execution_time_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ManagerResult::Success { .. })
    }
}

/// One agent's contribution to a fan-out execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTaskRecord {
    pub agent: String,
    pub task: String,
    pub result: TaskResult,
}

/// Result of running a task against several agents (shared task or
/// per-agent directives).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FanoutResult {
    Success {
        /// Markdown document with one section per agent.
        combined_response: String,
        results: Vec<AgentTaskRecord>,
        execution_time_ms: u64,
    },
    Error {
        error: String,
        execution_time_ms: u64,
    },
}

impl FanoutResult {
    pub fn error(message: impl Into<String>, execution_time_ms: u64) -> Self {
        FanoutResult::Error {
            error: message.into(),
            execution_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_result_envelope_tagging() {
        let ok = TaskResult::Success {
            thought_process: "think".into(),
            response: "done".into(),
            tool_calls: vec![],
            execution_time_ms: 3,
        };
        let v = serde_json::to_value(&ok).unwrap();
        assert_eq!(v["status"], "success");
        assert_eq!(v["response"], "done");

        let err = TaskResult::error("boom", 1);
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["status"], "error");
        assert_eq!(v["error"], "boom");
        assert!(v.get("raw_content").is_none());
    }

    #[test]
    fn test_plan_step_reason_defaults_to_empty() {
        let step: PlanStep =
            serde_json::from_str(r#"{"agent": "Alice", "task": "do X"}"#).unwrap();
        assert_eq!(step.agent, "Alice");
        assert_eq!(step.reason, "");
    }

    #[test]
    fn test_plan_outcome_lowercase() {
        let summary: PlanSummary =
            serde_json::from_str(r#"{"summary": "ok", "outcome": "partial"}"#).unwrap();
        assert_eq!(summary.outcome, PlanOutcome::Partial);
        assert!(summary.next_steps.is_empty());
    }
}
