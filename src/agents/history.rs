//! Execution history and continuation chains.
//!
//! Every orchestration call appends exactly one entry to its group's
//! history. Entries are never mutated; an optional `parent_id` links an
//! entry to the execution it continued from, so entries form a forest
//! scoped to one group. The log is capped at the newest
//! [`HISTORY_CAP`] entries to bound persisted size.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Maximum number of history entries retained per group.
pub const HISTORY_CAP: usize = 100;

/// Which entry protocol produced a history entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    ManagerExecution,
    SingleAgentExecution,
    DirectiveExecution,
    MultiAgentExecution,
}

/// One durable record of a past execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub kind: HistoryKind,
    /// The originating task text.
    pub task: String,
    /// Names of the agents involved.
    pub agents: Vec<String>,
    /// Type-specific result payload (a serialized result envelope).
    pub payload: serde_json::Value,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    /// Entry this execution continued from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
}

impl HistoryEntry {
    pub fn new(
        kind: HistoryKind,
        task: impl Into<String>,
        agents: Vec<String>,
        payload: serde_json::Value,
        duration_ms: u64,
        parent_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            task: task.into(),
            agents,
            payload,
            duration_ms,
            timestamp: Utc::now(),
            parent_id,
        }
    }
}

/// Walk the continuation chain containing `entry_id`.
///
/// Returns the connected set: all ancestors (oldest first), the entry
/// itself, then all descendants in breadth-first order. The walk is
/// iterative with a visited set, so malformed or cyclic `parent_id` data
/// terminates instead of recursing forever; a `parent_id` pointing at an
/// evicted entry is treated as a root.
pub fn continuation_chain(history: &[HistoryEntry], entry_id: Uuid) -> Vec<HistoryEntry> {
    let Some(entry) = history.iter().find(|e| e.id == entry_id) else {
        return Vec::new();
    };

    let mut visited: HashSet<Uuid> = HashSet::new();
    visited.insert(entry.id);

    // Ancestors, collected child-to-parent then reversed.
    let mut ancestors: Vec<&HistoryEntry> = Vec::new();
    let mut cursor = entry.parent_id;
    while let Some(parent_id) = cursor {
        if !visited.insert(parent_id) {
            tracing::warn!("Cycle detected in continuation chain at entry {}", parent_id);
            break;
        }
        match history.iter().find(|e| e.id == parent_id) {
            Some(parent) => {
                ancestors.push(parent);
                cursor = parent.parent_id;
            }
            // Dangling parent: the referenced entry was evicted.
            None => break,
        }
    }
    ancestors.reverse();

    let mut chain: Vec<HistoryEntry> = ancestors.into_iter().cloned().collect();
    chain.push(entry.clone());

    // Descendants, breadth-first from the set collected so far.
    let mut frontier: std::collections::VecDeque<Uuid> = chain.iter().map(|e| e.id).collect();
    while let Some(current) = frontier.pop_front() {
        for child in history.iter().filter(|e| e.parent_id == Some(current)) {
            if visited.insert(child.id) {
                chain.push(child.clone());
                frontier.push_back(child.id);
            }
        }
    }

    chain
}

/// A continuation prepared from a prior history entry: the synthesized seed
/// task plus the lineage and agent targeting to carry forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingContinuation {
    /// Synthesized task string seeding the next execution.
    pub task: String,
    /// The entry being continued from; becomes the next entry's parent.
    pub parent_id: Uuid,
    /// Agents the previous execution targeted; the next dispatch re-targets
    /// them unless the caller overrides.
    pub agents: Vec<String>,
}

/// Build a continuation from a history entry.
///
/// The seed task embeds a type-specific rendering of the stored result:
/// the manager summary for coordinated runs, the response text for a
/// single-agent run, and the combined Markdown for fan-out runs.
pub fn prepare_continuation(entry: &HistoryEntry) -> PendingContinuation {
    let rendered = render_result(entry);
    PendingContinuation {
        task: format!(
            "Previous task: {}\n\nResult:\n{}\n\nContinue from here:",
            entry.task, rendered
        ),
        parent_id: entry.id,
        agents: entry.agents.clone(),
    }
}

fn render_result(entry: &HistoryEntry) -> String {
    let field = match entry.kind {
        HistoryKind::ManagerExecution => "summary",
        HistoryKind::SingleAgentExecution => "response",
        HistoryKind::DirectiveExecution | HistoryKind::MultiAgentExecution => "combined_response",
    };
    match entry.payload.get(field).and_then(|v| v.as_str()) {
        Some(text) => text.to_string(),
        // Error payloads have no result field; fall back to the error
        // message, then to the raw payload.
        None => match entry.payload.get("error").and_then(|v| v.as_str()) {
            Some(error) => format!("(failed) {}", error),
            None => entry.payload.to_string(),
        },
    }
}

/// Session-scoped continuation state.
///
/// When `track_chain` is set, each dispatch attaches the pending parent id
/// to its history entry and the new entry id becomes the pending parent,
/// forming the history forest.
#[derive(Debug, Clone, Default)]
pub struct ContinuationTracker {
    pub track_chain: bool,
    pub pending_parent: Option<Uuid>,
    /// Agent targeting carried over from a prepared continuation.
    pub pending_agents: Vec<String>,
}

impl ContinuationTracker {
    /// Parent id for the next history entry, if chain tracking is on.
    pub fn parent_for_next(&self) -> Option<Uuid> {
        if self.track_chain {
            self.pending_parent
        } else {
            None
        }
    }

    /// Record a freshly appended entry as the new chain head.
    pub fn record_entry(&mut self, entry_id: Uuid) {
        if self.track_chain {
            self.pending_parent = Some(entry_id);
        }
    }

    /// Load a prepared continuation, enabling chain tracking and re-targeting
    /// the previous execution's agents.
    pub fn load(&mut self, continuation: &PendingContinuation) {
        self.track_chain = true;
        self.pending_parent = Some(continuation.parent_id);
        self.pending_agents = continuation.agents.clone();
    }

    /// Take the carried-over agent targeting, clearing it.
    pub fn take_agents(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(kind: HistoryKind, parent: Option<Uuid>) -> HistoryEntry {
        HistoryEntry::new(kind, "task", vec!["Alice".into()], json!({}), 1, parent)
    }

    #[test]
    fn test_chain_includes_ancestors_and_descendants() {
        let a = entry(HistoryKind::SingleAgentExecution, None);
        let b = entry(HistoryKind::SingleAgentExecution, Some(a.id));
        let c = entry(HistoryKind::SingleAgentExecution, Some(b.id));
        let unrelated = entry(HistoryKind::SingleAgentExecution, None);
        let history = vec![a.clone(), b.clone(), c.clone(), unrelated.clone()];

        let chain = continuation_chain(&history, b.id);
        let ids: Vec<Uuid> = chain.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
        assert!(!ids.contains(&unrelated.id));
    }

    #[test]
    fn test_chain_terminates_on_cycle() {
        let mut a = entry(HistoryKind::SingleAgentExecution, None);
        let b = entry(HistoryKind::SingleAgentExecution, Some(a.id));
        a.parent_id = Some(b.id); // malformed: mutual parents
        let history = vec![a.clone(), b.clone()];

        let chain = continuation_chain(&history, a.id);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_chain_treats_dangling_parent_as_root() {
        let evicted = Uuid::new_v4();
        let a = entry(HistoryKind::SingleAgentExecution, Some(evicted));
        let chain = continuation_chain(&[a.clone()], a.id);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].id, a.id);
    }

    #[test]
    fn test_chain_unknown_entry_is_empty() {
        let a = entry(HistoryKind::SingleAgentExecution, None);
        assert!(continuation_chain(&[a], Uuid::new_v4()).is_empty());
    }

    #[test]
    fn test_prepare_continuation_renders_response() {
        let mut e = entry(HistoryKind::SingleAgentExecution, None);
        e.task = "Write a haiku".to_string();
        e.payload = json!({"status": "success", "response": "Autumn leaves falling"});

        let continuation = prepare_continuation(&e);
        assert!(continuation.task.contains("Previous task: Write a haiku"));
        assert!(continuation.task.contains("Autumn leaves falling"));
        assert!(continuation.task.ends_with("Continue from here:"));
        assert_eq!(continuation.parent_id, e.id);
        assert_eq!(continuation.agents, vec!["Alice".to_string()]);
    }

    #[test]
    fn test_prepare_continuation_renders_error_payload() {
        let mut e = entry(HistoryKind::ManagerExecution, None);
        e.payload = json!({"status": "error", "error": "plan failed"});
        let continuation = prepare_continuation(&e);
        assert!(continuation.task.contains("(failed) plan failed"));
    }

    #[test]
    fn test_tracker_only_links_when_tracking() {
        let mut tracker = ContinuationTracker::default();
        assert_eq!(tracker.parent_for_next(), None);
        tracker.record_entry(Uuid::new_v4());
        assert_eq!(tracker.parent_for_next(), None);

        tracker.track_chain = true;
        let id = Uuid::new_v4();
        tracker.record_entry(id);
        assert_eq!(tracker.parent_for_next(), Some(id));
    }
}
