//! JSON Schema definitions for structured model responses.
//!
//! Passed as the `format` constraint on completion calls. The core relies on
//! the runtime enforcing these schemas; a violation still only surfaces as a
//! parse error folded into a result envelope.

use serde_json::{json, Value};

/// Schema for a worker agent's task response.
pub fn agent_response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "thought_process": {
                "type": "string",
                "description": "Agent's reasoning about the task"
            },
            "tool_calls": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "tool": {"type": "string"},
                        "input": {"type": "object"}
                    },
                    "required": ["tool", "input"]
                }
            },
            "response": {
                "type": "string",
                "description": "Agent's final response"
            }
        },
        "required": ["thought_process", "response"]
    })
}

/// Schema for a tool execution response.
pub fn tool_response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "status": {
                "type": "string",
                "enum": ["success", "error"],
                "description": "Status of the tool execution"
            },
            "result": {
                "type": "object",
                "description": "Tool execution result data"
            },
            "error": {
                "type": "string",
                "description": "Error message if execution failed"
            }
        },
        "required": ["status"]
    })
}

/// Schema for the manager's planning response.
pub fn plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "thought_process": {"type": "string"},
            "steps": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "agent": {"type": "string"},
                        "task": {"type": "string"},
                        "reason": {"type": "string"}
                    },
                    "required": ["agent", "task"]
                }
            }
        },
        "required": ["thought_process", "steps"]
    })
}

/// Schema for the manager's final summary.
pub fn summary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": {"type": "string"},
            "outcome": {
                "type": "string",
                "enum": ["success", "partial", "failure"]
            },
            "next_steps": {
                "type": "array",
                "items": {"type": "string"}
            }
        },
        "required": ["summary", "outcome"]
    })
}
