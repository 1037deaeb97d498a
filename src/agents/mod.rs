//! Multi-agent orchestration: agents, groups, and the execution protocols
//! that run tasks through them.

pub mod agent;
pub mod directives;
pub mod dispatch;
pub mod group;
pub mod history;
pub mod schemas;
pub mod types;

pub use agent::{Agent, AgentRole};
pub use directives::parse_agent_directives;
pub use dispatch::{execute_task_with_directives, execute_with_agent, execute_with_multiple_agents};
pub use group::AgentGroup;
pub use history::{
    continuation_chain, prepare_continuation, ContinuationTracker, HistoryEntry, HistoryKind,
    PendingContinuation,
};
pub use types::{
    AgentTaskRecord, FanoutResult, ManagerResult, MemoryEntry, PlanOutcome, PlanStep, PlanSummary,
    StepResult, TaskPlan, TaskResult, ToolCallRequest, ToolResult,
};
