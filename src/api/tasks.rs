//! Task execution, history, and continuation handlers.
//!
//! Execution failures are envelopes, not HTTP errors: a task that runs and
//! fails still returns 200 with an `{"status": "error", ...}` body. HTTP
//! error codes are reserved for unknown groups and entries.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use uuid::Uuid;

use crate::agents::history;
use crate::agents::{
    dispatch, ContinuationTracker, FanoutResult, HistoryEntry, ManagerResult,
    PendingContinuation, TaskResult,
};

use super::routes::{fetch_group, not_found, ApiResult, AppState};
use super::types::*;

/// Take the group's session tracker out of the state map, applying an
/// optional tracking toggle. Turning tracking off drops the pending chain.
async fn take_tracker(state: &AppState, id: Uuid, toggle: Option<bool>) -> ContinuationTracker {
    let mut tracker = state
        .trackers
        .write()
        .await
        .remove(&id)
        .unwrap_or_default();
    if let Some(track) = toggle {
        tracker.track_chain = track;
        if !track {
            tracker.pending_parent = None;
            tracker.pending_agents.clear();
        }
    }
    tracker
}

async fn put_tracker(state: &AppState, id: Uuid, tracker: ContinuationTracker) {
    state.trackers.write().await.insert(id, tracker);
}

pub(super) async fn execute_manager(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ExecuteTaskRequest>,
) -> ApiResult<Json<ManagerResult>> {
    let mut group = fetch_group(&state, id).await?;
    let mut tracker = take_tracker(&state, id, request.track_chain).await;

    let result = group
        .execute_task_with_manager(
            state.client.as_ref(),
            state.store.as_ref(),
            &request.task,
            &mut tracker,
        )
        .await;

    put_tracker(&state, id, tracker).await;
    Ok(Json(result))
}

pub(super) async fn execute_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ExecuteAgentRequest>,
) -> ApiResult<Json<TaskResult>> {
    let mut group = fetch_group(&state, id).await?;
    let mut tracker = take_tracker(&state, id, request.track_chain).await;

    let result = dispatch::execute_with_agent(
        &mut group,
        state.client.as_ref(),
        state.store.as_ref(),
        &request.agent,
        &request.task,
        &mut tracker,
    )
    .await;

    put_tracker(&state, id, tracker).await;
    Ok(Json(result))
}

pub(super) async fn execute_multi(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ExecuteMultiRequest>,
) -> ApiResult<Json<FanoutResult>> {
    let mut group = fetch_group(&state, id).await?;
    let mut tracker = take_tracker(&state, id, request.track_chain).await;

    // An empty selection falls back to agents carried over from a prepared
    // continuation.
    let agents = if request.agents.is_empty() {
        tracker.take_agents()
    } else {
        request.agents
    };

    let result = dispatch::execute_with_multiple_agents(
        &mut group,
        state.client.as_ref(),
        state.store.as_ref(),
        &agents,
        &request.task,
        &mut tracker,
    )
    .await;

    put_tracker(&state, id, tracker).await;
    Ok(Json(result))
}

pub(super) async fn execute_directives(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ExecuteTaskRequest>,
) -> ApiResult<Json<FanoutResult>> {
    let mut group = fetch_group(&state, id).await?;
    let mut tracker = take_tracker(&state, id, request.track_chain).await;

    let result = dispatch::execute_task_with_directives(
        &mut group,
        state.client.as_ref(),
        state.store.as_ref(),
        &request.task,
        &mut tracker,
    )
    .await;

    put_tracker(&state, id, tracker).await;
    Ok(Json(result))
}

pub(super) async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let group = fetch_group(&state, id).await?;
    Ok(Json(group.history))
}

pub(super) async fn get_chain(
    State(state): State<Arc<AppState>>,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let group = fetch_group(&state, id).await?;
    let chain = history::continuation_chain(&group.history, entry_id);
    if chain.is_empty() {
        return Err(not_found(format!("History entry {} not found", entry_id)));
    }
    Ok(Json(chain))
}

pub(super) async fn prepare_continuation(
    State(state): State<Arc<AppState>>,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<PendingContinuation>> {
    let group = fetch_group(&state, id).await?;
    let Some(entry) = group.history.iter().find(|e| e.id == entry_id) else {
        return Err(not_found(format!("History entry {} not found", entry_id)));
    };

    let continuation = history::prepare_continuation(entry);
    state
        .trackers
        .write()
        .await
        .entry(id)
        .or_default()
        .load(&continuation);
    Ok(Json(continuation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{Agent, AgentGroup, HistoryKind};
    use crate::config::Config;
    use crate::llm::testing::ScriptedClient;
    use crate::store::{GroupStore, InMemoryGroupStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::sync::RwLock;
    use tower::util::ServiceExt;

    fn test_state(client: ScriptedClient) -> Arc<AppState> {
        Arc::new(AppState {
            config: Config::new(
                "http://127.0.0.1:11434".to_string(),
                "llama2".to_string(),
                std::path::PathBuf::from("data"),
            ),
            store: Arc::new(InMemoryGroupStore::new()),
            client: Arc::new(client),
            trackers: RwLock::new(HashMap::new()),
        })
    }

    fn app(state: Arc<AppState>) -> axum::Router {
        super::super::routes::router().with_state(state)
    }

    async fn seed_group(state: &AppState, names: &[&str]) -> Uuid {
        let mut group = AgentGroup::new("Crew", "test crew");
        for name in names {
            group.add_agent(Agent::new(*name, "llama2", format!("I am {}.", name), vec![]));
        }
        let id = group.id;
        state.store.upsert_group(group).await.unwrap();
        id
    }

    async fn post_json(
        app: axum::Router,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_execute_agent_returns_envelope_with_200() {
        let client = ScriptedClient::with_contents(&[
            &json!({"thought_process": "t", "response": "Hello!"}).to_string(),
        ]);
        let state = test_state(client);
        let id = seed_group(&state, &["Alice"]).await;

        let (status, body) = post_json(
            app(Arc::clone(&state)),
            &format!("/api/groups/{}/execute/agent", id),
            json!({"agent": "Alice", "task": "Say hello"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["response"], "Hello!");

        // The run was persisted.
        let group = state.store.get_group(id).await.unwrap().unwrap();
        assert_eq!(group.history.len(), 1);
        assert_eq!(group.history[0].kind, HistoryKind::SingleAgentExecution);
    }

    #[tokio::test]
    async fn test_execute_agent_failure_is_envelope_not_http_error() {
        let state = test_state(ScriptedClient::failing("ollama is down"));
        let id = seed_group(&state, &["Alice"]).await;

        let (status, body) = post_json(
            app(state),
            &format!("/api/groups/{}/execute/agent", id),
            json!({"agent": "Alice", "task": "Say hello"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert!(body["error"].as_str().unwrap().contains("ollama is down"));
    }

    #[tokio::test]
    async fn test_unknown_group_is_404() {
        let state = test_state(ScriptedClient::new());
        let (status, _) = post_json(
            app(state),
            &format!("/api/groups/{}/execute/agent", Uuid::new_v4()),
            json!({"agent": "Alice", "task": "Say hello"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_continuation_roundtrip_links_history() {
        let client = ScriptedClient::with_contents(&[
            &json!({"thought_process": "t", "response": "first answer"}).to_string(),
            &json!({"thought_process": "t", "response": "second answer"}).to_string(),
        ]);
        let state = test_state(client);
        let id = seed_group(&state, &["Alice"]).await;

        let (status, first) = post_json(
            app(Arc::clone(&state)),
            &format!("/api/groups/{}/execute/agent", id),
            json!({"agent": "Alice", "task": "Start"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["status"], "success");

        let group = state.store.get_group(id).await.unwrap().unwrap();
        let entry_id = group.history[0].id;

        let (status, continuation) = post_json(
            app(Arc::clone(&state)),
            &format!("/api/groups/{}/history/{}/continue", id, entry_id),
            json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let seed_task = continuation["task"].as_str().unwrap().to_string();
        assert!(seed_task.contains("Previous task: Start"));
        assert!(seed_task.contains("first answer"));

        let (status, _) = post_json(
            app(Arc::clone(&state)),
            &format!("/api/groups/{}/execute/agent", id),
            json!({"agent": "Alice", "task": seed_task}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let group = state.store.get_group(id).await.unwrap().unwrap();
        assert_eq!(group.history.len(), 2);
        assert_eq!(group.history[1].parent_id, Some(entry_id));
    }

    #[tokio::test]
    async fn test_chain_endpoint_404_for_unknown_entry() {
        let state = test_state(ScriptedClient::new());
        let id = seed_group(&state, &["Alice"]).await;

        let response = app(state)
            .oneshot(
                Request::get(format!(
                    "/api/groups/{}/history/{}/chain",
                    id,
                    Uuid::new_v4()
                ))
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
