//! A group of agents that work together.
//!
//! The group owns its agents, a shared-memory log, and the execution
//! history. It also owns the manager coordination protocol: a manager-role
//! model plans the task as a list of per-agent steps, the steps run strictly
//! in order (later steps can observe shared memory written by earlier ones),
//! and the manager then folds the per-step results into a final summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use crate::agents::agent::{Agent, AgentRole};
use crate::agents::history::{ContinuationTracker, HistoryEntry, HistoryKind, HISTORY_CAP};
use crate::agents::schemas::{plan_schema, summary_schema};
use crate::agents::types::{
    ManagerResult, MemoryEntry, PlanSummary, StepResult, TaskPlan, TaskResult,
    SOURCE_EXECUTION, SOURCE_GROUP_MEMORY, SOURCE_MANAGER, SOURCE_SELF_REFLECTION, SOURCE_TASK,
};
use crate::llm::{ChatMessage, ChatOptions, LlmClient};
use crate::store::GroupStore;

/// Sampling temperature for manager planning and summarization calls.
const MANAGER_TEMPERATURE: f32 = 0.3;

/// Model used for manager-role calls when the group has no agents at all.
const DEFAULT_MANAGER_MODEL: &str = "llama2";

/// How many shared-memory entries are propagated or rendered at a time.
const SHARED_MEMORY_WINDOW: usize = 5;

/// How many of an agent's recent memories are shared back with the group
/// after a successful step.
const REFLECTION_WINDOW: usize = 3;

/// A named collection of agents plus shared memory and execution history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentGroup {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub shared_memory: Vec<MemoryEntry>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
}

impl AgentGroup {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let group = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            agents: Vec::new(),
            shared_memory: Vec::new(),
            history: Vec::new(),
            created_at: Utc::now(),
        };
        tracing::info!("Created new AgentGroup: {} (ID: {})", group.name, group.id);
        group
    }

    /// Add an agent to the group, returning its id.
    pub fn add_agent(&mut self, agent: Agent) -> Uuid {
        let id = agent.id;
        self.agents.push(agent);
        id
    }

    /// Resolve an agent by exact name.
    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// Resolve an agent by exact name, mutably.
    pub fn agent_mut(&mut self, name: &str) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.name == name)
    }

    /// Remove an agent by name. Returns whether it existed.
    pub fn remove_agent(&mut self, name: &str) -> bool {
        let before = self.agents.len();
        self.agents.retain(|a| a.name != name);
        before != self.agents.len()
    }

    /// The manager-role agent, if one exists. When several agents carry the
    /// manager role (a caller error), the first in agent order coordinates.
    pub fn manager(&self) -> Option<&Agent> {
        self.agents.iter().find(|a| a.role == AgentRole::Manager)
    }

    /// The model used for manager-role calls: the manager agent's model if
    /// present, else the first agent's model, else a fixed fallback.
    pub fn manager_model(&self) -> String {
        if let Some(manager) = self.manager() {
            tracing::info!(
                "Using manager agent '{}' with model {}",
                manager.name,
                manager.model
            );
            return manager.model.clone();
        }
        match self.agents.first() {
            Some(first) => {
                tracing::warn!(
                    "No manager agent found. Using model {} as fallback",
                    first.model
                );
                first.model.clone()
            }
            None => DEFAULT_MANAGER_MODEL.to_string(),
        }
    }

    /// Add a memory entry to the group's shared memory.
    pub fn add_shared_memory(&mut self, content: impl Into<String>, source: &str) {
        self.shared_memory.push(MemoryEntry::new(content, source));
        tracing::info!(
            "Added shared memory to group {} from source: {}",
            self.name,
            source
        );
    }

    /// Append a history entry, evicting the oldest entries beyond the cap,
    /// and return the entry id.
    pub fn add_to_history(&mut self, entry: HistoryEntry) -> Uuid {
        let id = entry.id;
        self.history.push(entry);
        if self.history.len() > HISTORY_CAP {
            let excess = self.history.len() - HISTORY_CAP;
            self.history.drain(..excess);
        }
        id
    }

    /// Copy the newest shared-memory entries into an agent's own memory,
    /// tagged `group_memory`, so the agent sees cross-agent context.
    pub fn share_memory_with_agent(&mut self, name: &str) {
        if self.shared_memory.is_empty() {
            return;
        }
        let window_start = self
            .shared_memory
            .len()
            .saturating_sub(SHARED_MEMORY_WINDOW);
        let window: Vec<String> = self.shared_memory[window_start..]
            .iter()
            .map(|m| format!("Group shared: {}", m.content))
            .collect();
        if let Some(agent) = self.agent_mut(name) {
            let count = window.len();
            for content in window {
                agent.add_to_memory(content, SOURCE_GROUP_MEMORY);
            }
            tracing::info!("Shared {} group memories with agent {}", count, name);
        }
    }

    /// Format non-manager agent capabilities for the manager prompt.
    fn format_agent_capabilities(&self) -> String {
        if self.agents.is_empty() {
            return "No agents available.".to_string();
        }
        let capabilities: Vec<String> = self
            .agents
            .iter()
            .filter(|a| a.role != AgentRole::Manager)
            .map(|a| format!("- {}: {}", a.name, a.system_prompt))
            .collect();
        if capabilities.is_empty() {
            return "No non-manager agents available.".to_string();
        }
        capabilities.join("\n")
    }

    /// The system prompt for manager-role calls.
    pub fn manager_prompt(&self) -> String {
        format!(
            "You are the manager of a group of AI agents named '{}'. Your role is to:\n\
             1. Analyze tasks and break them down into subtasks\n\
             2. Assign subtasks to appropriate agents based on their capabilities\n\
             3. Coordinate between agents and aggregate their responses\n\
             4. Maintain group coherence and shared context\n\n\
             Available Agents:\n{}\n\n\
             IMPORTANT FORMATTING INSTRUCTIONS:\n\
             You must respond in valid JSON format matching the requested schema.\n\
             - Be precise with agent names - only assign tasks to agents that exist in the list above\n\
             - Do not assign a task to an agent that doesn't exist\n\n\
             Use the shared memory to maintain context and track progress. \
             Be decisive in task delegation and clear in your communication.",
            self.name,
            self.format_agent_capabilities()
        )
    }

    /// Manager prompt plus the newest shared-memory entries as context.
    fn manager_system_prompt(&self) -> String {
        let mut prompt = self.manager_prompt();
        if !self.shared_memory.is_empty() {
            let window_start = self
                .shared_memory
                .len()
                .saturating_sub(SHARED_MEMORY_WINDOW);
            let rendered: Vec<String> = self.shared_memory[window_start..]
                .iter()
                .map(|m| format!("- {}", m.content))
                .collect();
            prompt.push_str("\n\nGroup Memory Context:\n");
            prompt.push_str(&rendered.join("\n"));
        }
        prompt
    }

    /// Execute a task using the manager role to coordinate the group.
    ///
    /// Three sequential phases: planning, dispatch, summarization. A missing
    /// agent in a plan step becomes an inline error result and the plan
    /// continues; a plan or summary that fails to parse is terminal for the
    /// whole invocation. On success one `manager_execution` history entry is
    /// appended and the group persisted. No error propagates out of this
    /// method.
    pub async fn execute_task_with_manager(
        &mut self,
        client: &dyn LlmClient,
        store: &dyn GroupStore,
        task: &str,
        tracker: &mut ContinuationTracker,
    ) -> ManagerResult {
        tracing::info!(
            "Group {} executing task with manager: {:.50}...",
            self.name,
            task
        );
        let start = Instant::now();

        // Phase 1: planning.
        let manager_model = self.manager_model();
        let system_prompt = self.manager_system_prompt();
        let planning_user = format!(
            "Task: {}\n\nAnalyze this task and create a plan using the available agents. \
             If an agent does not exist, do not assign it any tasks. Break it down into \
             clear steps. Respond in JSON and only assign tasks to agents that exist in \
             the group.",
            task
        );
        let planning_messages = vec![
            ChatMessage::system(system_prompt.clone()),
            ChatMessage::user(planning_user.clone()),
        ];

        let plan_content = match client
            .chat_completion(
                &manager_model,
                &planning_messages,
                None,
                ChatOptions::schema(MANAGER_TEMPERATURE, plan_schema()),
            )
            .await
        {
            Ok(response) => response.content_or_empty().to_string(),
            Err(e) => {
                tracing::error!(
                    "Error in manager task execution for group {}: {}",
                    self.name,
                    e
                );
                return ManagerResult::error(e.to_string(), start.elapsed().as_millis() as u64);
            }
        };

        let plan: TaskPlan = match serde_json::from_str(&plan_content) {
            Ok(plan) => plan,
            Err(_) => {
                tracing::error!("Failed to parse manager plan response: {}", plan_content);
                return ManagerResult::Error {
                    error: "Failed to parse manager plan response".to_string(),
                    raw_content: Some(plan_content),
                    execution_time_ms: start.elapsed().as_millis() as u64,
                };
            }
        };

        tracing::info!("Manager created plan with {} steps", plan.steps.len());
        self.add_shared_memory(
            format!("Task Planning: {}", plan.thought_process),
            SOURCE_MANAGER,
        );

        // Phase 2: dispatch, strictly in plan order.
        let mut results: Vec<StepResult> = Vec::new();
        for step in &plan.steps {
            if self.agent(&step.agent).is_none() {
                tracing::warn!("Invalid agent name in plan: {}", step.agent);
                results.push(StepResult {
                    agent: step.agent.clone(),
                    subtask: step.task.clone(),
                    reason: step.reason.clone(),
                    result: TaskResult::error(format!("Agent {} not found", step.agent), 0),
                });
                continue;
            }

            tracing::info!(
                "Executing step with agent {}: {:.50}...",
                step.agent,
                step.task
            );
            self.share_memory_with_agent(&step.agent);

            let result = match self.agent_mut(&step.agent) {
                Some(agent) => agent.execute_task(client, &step.task).await,
                None => TaskResult::error(format!("Agent {} not found", step.agent), 0),
            };

            match &result {
                TaskResult::Success {
                    thought_process,
                    response,
                    ..
                } => {
                    let summary = format!(
                        "Agent {} completed task: {}\nThought process: {}\nResponse: {}",
                        step.agent, step.task, thought_process, response
                    );
                    let reflection =
                        format!("I completed task: {}\nResponse: {}", step.task, response);

                    // Reflection into the agent's own memory, then the
                    // agent's recent individual memories back to the group.
                    let mut shared_back: Vec<String> = Vec::new();
                    if let Some(agent) = self.agent_mut(&step.agent) {
                        agent.add_to_memory(reflection, SOURCE_SELF_REFLECTION);
                        let individual: Vec<&MemoryEntry> = agent
                            .memory
                            .iter()
                            .filter(|m| m.source != SOURCE_GROUP_MEMORY)
                            .collect();
                        let window_start = individual.len().saturating_sub(REFLECTION_WINDOW);
                        for memory in &individual[window_start..] {
                            if memory.source != SOURCE_TASK {
                                shared_back.push(memory.content.clone());
                            }
                        }
                    }
                    self.add_shared_memory(summary, SOURCE_EXECUTION);
                    let source = format!("agent_{}", step.agent);
                    for content in shared_back {
                        self.add_shared_memory(
                            format!("Agent {}'s memory: {}", step.agent, content),
                            &source,
                        );
                    }
                }
                TaskResult::Error { error, .. } => {
                    self.add_shared_memory(
                        format!(
                            "Agent {} failed task: {}\nError: {}",
                            step.agent, step.task, error
                        ),
                        SOURCE_EXECUTION,
                    );
                }
            }

            results.push(StepResult {
                agent: step.agent.clone(),
                subtask: step.task.clone(),
                reason: step.reason.clone(),
                result,
            });
        }

        // Phase 3: summarization over the original conversation plus results.
        let mut summary_messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(planning_user),
            ChatMessage::assistant(
                serde_json::to_string(&plan).unwrap_or_else(|_| "{}".to_string()),
            ),
        ];

        let mut result_content = String::new();
        for step_result in &results {
            match &step_result.result {
                TaskResult::Success { response, .. } => {
                    result_content.push_str(&format!(
                        "Result from {}: {}\n\n",
                        step_result.agent, response
                    ));
                }
                TaskResult::Error { error, .. } => {
                    result_content
                        .push_str(&format!("Error from {}: {}\n\n", step_result.agent, error));
                }
            }
        }
        if result_content.is_empty() {
            summary_messages.push(ChatMessage::user(
                "Provide a final summary of the task execution and results. \
                 Include what was accomplished and any conclusions drawn.",
            ));
        } else {
            summary_messages.push(ChatMessage::user(format!(
                "Here are the results from the agents:\n\n{}\n\nProvide a final summary \
                 of the task execution and results. Include what was accomplished and \
                 any conclusions drawn.",
                result_content.trim()
            )));
        }

        let summary_content = match client
            .chat_completion(
                &manager_model,
                &summary_messages,
                None,
                ChatOptions::schema(MANAGER_TEMPERATURE, summary_schema()),
            )
            .await
        {
            Ok(response) => response.content_or_empty().to_string(),
            Err(e) => {
                tracing::error!(
                    "Error in manager task execution for group {}: {}",
                    self.name,
                    e
                );
                // Completed steps already mutated agent and shared memory;
                // a failed summary does not roll them back.
                self.persist_to(store).await;
                return ManagerResult::error(e.to_string(), start.elapsed().as_millis() as u64);
            }
        };

        let summary: PlanSummary = match serde_json::from_str(&summary_content) {
            Ok(summary) => summary,
            Err(_) => {
                tracing::error!(
                    "Failed to parse manager summary response: {}",
                    summary_content
                );
                self.persist_to(store).await;
                return ManagerResult::Error {
                    error: "Failed to parse manager summary response".to_string(),
                    raw_content: Some(summary_content),
                    execution_time_ms: start.elapsed().as_millis() as u64,
                };
            }
        };

        self.add_shared_memory(format!("Task Summary: {}", summary.summary), SOURCE_MANAGER);

        let duration_ms = start.elapsed().as_millis() as u64;
        let involved: Vec<String> = results.iter().map(|r| r.agent.clone()).collect();
        let envelope = ManagerResult::Success {
            plan,
            results,
            summary: summary.summary,
            outcome: summary.outcome,
            next_steps: summary.next_steps,
            execution_time_ms: duration_ms,
        };

        let entry = HistoryEntry::new(
            HistoryKind::ManagerExecution,
            task,
            involved,
            serde_json::to_value(&envelope).unwrap_or_default(),
            duration_ms,
            tracker.parent_for_next(),
        );
        let entry_id = self.add_to_history(entry);
        tracker.record_entry(entry_id);
        self.persist_to(store).await;

        envelope
    }

    /// Write the group back to the store; a persist failure is logged, never
    /// propagated.
    async fn persist_to(&self, store: &dyn GroupStore) {
        if let Err(e) = store.upsert_group(self.clone()).await {
            tracing::warn!("Failed to persist group {}: {}", self.name, e);
        }
    }
}
