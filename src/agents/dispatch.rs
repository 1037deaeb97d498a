//! Direct dispatch: run a task against one named agent, against several
//! agents in parallel order, or fanned out via inline `@Name:` directives.
//!
//! These are the non-manager execution paths. Each successful dispatch
//! appends one history entry, links it into the continuation chain when the
//! tracker asks for it, and persists the group.

use std::time::Instant;

use crate::agents::directives::parse_agent_directives;
use crate::agents::group::AgentGroup;
use crate::agents::history::{ContinuationTracker, HistoryEntry, HistoryKind};
use crate::agents::types::{
    AgentTaskRecord, FanoutResult, TaskResult, SOURCE_EXECUTION, SOURCE_SELF_REFLECTION,
};
use crate::llm::LlmClient;
use crate::store::GroupStore;

/// Execute a task with one named agent.
///
/// The agent sees the group's recent shared memory before the task runs,
/// and a successful response is written back to shared memory. A name that
/// resolves to no agent returns an error envelope without touching history.
pub async fn execute_with_agent(
    group: &mut AgentGroup,
    client: &dyn LlmClient,
    store: &dyn GroupStore,
    agent_name: &str,
    task: &str,
    tracker: &mut ContinuationTracker,
) -> TaskResult {
    let start = Instant::now();

    if group.agent(agent_name).is_none() {
        tracing::warn!("Agent {} not found in group {}", agent_name, group.name);
        return TaskResult::error(
            format!("Agent {} not found", agent_name),
            start.elapsed().as_millis() as u64,
        );
    }

    let result = run_agent_step(group, client, agent_name, task).await;

    let duration_ms = start.elapsed().as_millis() as u64;
    let entry = HistoryEntry::new(
        HistoryKind::SingleAgentExecution,
        task,
        vec![agent_name.to_string()],
        serde_json::to_value(&result).unwrap_or_default(),
        duration_ms,
        tracker.parent_for_next(),
    );
    let entry_id = group.add_to_history(entry);
    tracker.record_entry(entry_id);

    if let Err(e) = store.upsert_group(group.clone()).await {
        tracing::warn!("Failed to persist group {}: {}", group.name, e);
    }

    result
}

/// Execute the same task with several named agents, in the given order.
///
/// Each agent runs the full task; results are aggregated into one Markdown
/// document with a `## {agent}` section per agent. A name that resolves to
/// no agent becomes an inline error section and the fan-out continues.
pub async fn execute_with_multiple_agents(
    group: &mut AgentGroup,
    client: &dyn LlmClient,
    store: &dyn GroupStore,
    agent_names: &[String],
    task: &str,
    tracker: &mut ContinuationTracker,
) -> FanoutResult {
    if agent_names.is_empty() {
        return FanoutResult::error("No agents selected", 0);
    }
    let assignments: Vec<(String, String)> = agent_names
        .iter()
        .map(|name| (name.clone(), task.to_string()))
        .collect();
    fan_out(
        group,
        client,
        store,
        task,
        &assignments,
        HistoryKind::MultiAgentExecution,
        tracker,
    )
    .await
}

/// Execute a task containing inline `@Name: subtask` directives.
///
/// Each named agent runs only its own subtask. A task with no directive
/// naming a known agent returns an error envelope so the caller can fall
/// back to the manager or single-agent flows.
pub async fn execute_task_with_directives(
    group: &mut AgentGroup,
    client: &dyn LlmClient,
    store: &dyn GroupStore,
    task: &str,
    tracker: &mut ContinuationTracker,
) -> FanoutResult {
    let assignments = parse_agent_directives(task, &group.agents);
    if assignments.is_empty() {
        return FanoutResult::error("No agent directives found in task", 0);
    }
    tracing::info!(
        "Parsed {} agent directives from task in group {}",
        assignments.len(),
        group.name
    );
    fan_out(
        group,
        client,
        store,
        task,
        &assignments,
        HistoryKind::DirectiveExecution,
        tracker,
    )
    .await
}

async fn fan_out(
    group: &mut AgentGroup,
    client: &dyn LlmClient,
    store: &dyn GroupStore,
    task: &str,
    assignments: &[(String, String)],
    kind: HistoryKind,
    tracker: &mut ContinuationTracker,
) -> FanoutResult {
    let start = Instant::now();

    let mut records: Vec<AgentTaskRecord> = Vec::new();
    let mut sections: Vec<String> = Vec::new();
    for (name, subtask) in assignments {
        let result = if group.agent(name).is_some() {
            run_agent_step(group, client, name, subtask).await
        } else {
            tracing::warn!("Agent {} not found in group {}", name, group.name);
            TaskResult::error(format!("Agent {} not found", name), 0)
        };

        let section_body = match &result {
            TaskResult::Success { response, .. } => unwrap_response_text(response),
            TaskResult::Error { error, .. } => format!("Error: {}", error),
        };
        sections.push(format!("## {}\n\n{}", name, section_body));
        records.push(AgentTaskRecord {
            agent: name.clone(),
            task: subtask.clone(),
            result,
        });
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    let envelope = FanoutResult::Success {
        combined_response: sections.join("\n\n"),
        results: records,
        execution_time_ms: duration_ms,
    };

    let involved: Vec<String> = assignments.iter().map(|(name, _)| name.clone()).collect();
    let mut payload = serde_json::to_value(&envelope).unwrap_or_default();
    if kind == HistoryKind::DirectiveExecution {
        // Keep the parsed directive mapping alongside the envelope so a
        // continuation can see which agent got which subtask.
        let directives: serde_json::Map<String, serde_json::Value> = assignments
            .iter()
            .map(|(name, subtask)| (name.clone(), serde_json::Value::String(subtask.clone())))
            .collect();
        if let Some(object) = payload.as_object_mut() {
            object.insert(
                "directives".to_string(),
                serde_json::Value::Object(directives),
            );
        }
    }

    let entry = HistoryEntry::new(
        kind,
        task,
        involved,
        payload,
        duration_ms,
        tracker.parent_for_next(),
    );
    let entry_id = group.add_to_history(entry);
    tracker.record_entry(entry_id);

    if let Err(e) = store.upsert_group(group.clone()).await {
        tracing::warn!("Failed to persist group {}: {}", group.name, e);
    }

    envelope
}

/// Run one agent against a subtask: share group memory in, execute, and
/// write a successful response back to shared memory.
async fn run_agent_step(
    group: &mut AgentGroup,
    client: &dyn LlmClient,
    agent_name: &str,
    subtask: &str,
) -> TaskResult {
    group.share_memory_with_agent(agent_name);

    let result = match group.agent_mut(agent_name) {
        Some(agent) => agent.execute_task(client, subtask).await,
        None => return TaskResult::error(format!("Agent {} not found", agent_name), 0),
    };

    match &result {
        TaskResult::Success { response, .. } => {
            // Completion summary goes to both the agent's own memory and the
            // group's shared memory, matching the manager flow's reflection.
            let reflection = format!("I completed task: {}\nResponse: {}", subtask, response);
            if let Some(agent) = group.agent_mut(agent_name) {
                agent.add_to_memory(reflection, SOURCE_SELF_REFLECTION);
            }
            group.add_shared_memory(
                format!("Agent {} response: {}", agent_name, response),
                SOURCE_EXECUTION,
            );
        }
        TaskResult::Error { error, .. } => {
            tracing::warn!("Agent {} failed subtask: {}", agent_name, error);
        }
    }
    result
}

/// Models occasionally wrap the final answer in another layer of JSON. When
/// the response text itself parses as an object with a string `response`
/// field, unwrap it for display.
fn unwrap_response_text(response: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(response) {
        if let Some(inner) = value.get("response").and_then(|v| v.as_str()) {
            return inner.to_string();
        }
    }
    response.to_string()
}
