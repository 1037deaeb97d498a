//! Group and agent management handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::agents::{Agent, AgentGroup};

use super::routes::{bad_request, fetch_group, internal, not_found, ApiResult, AppState};
use super::types::*;

pub(super) async fn list_groups(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<GroupSummary>>> {
    let groups = state.store.list_groups().await.map_err(internal)?;
    Ok(Json(groups.iter().map(GroupSummary::from).collect()))
}

pub(super) async fn create_group(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateGroupRequest>,
) -> ApiResult<(StatusCode, Json<AgentGroup>)> {
    if request.name.trim().is_empty() {
        return Err(bad_request("Group name must not be empty"));
    }
    let group = AgentGroup::new(request.name.trim(), request.description);
    state
        .store
        .upsert_group(group.clone())
        .await
        .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub(super) async fn get_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AgentGroup>> {
    Ok(Json(fetch_group(&state, id).await?))
}

pub(super) async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.store.delete_group(id).await.map_err(internal)? {
        state.trackers.write().await.remove(&id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(format!("Group {} not found", id)))
    }
}

pub(super) async fn add_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateAgentRequest>,
) -> ApiResult<(StatusCode, Json<Agent>)> {
    if request.name.trim().is_empty() {
        return Err(bad_request("Agent name must not be empty"));
    }
    let mut group = fetch_group(&state, id).await?;
    if group.agent(request.name.trim()).is_some() {
        return Err(bad_request(format!(
            "Agent {} already exists in group",
            request.name.trim()
        )));
    }

    let model = request
        .model
        .unwrap_or_else(|| state.config.default_model.clone());
    let mut agent = Agent::new(
        request.name.trim(),
        model,
        request.system_prompt,
        request.tools,
    );
    agent.memory_limit = request.memory_limit;

    let created = agent.clone();
    group.add_agent(agent);
    state.store.upsert_group(group).await.map_err(internal)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(super) async fn update_agent(
    State(state): State<Arc<AppState>>,
    Path((id, name)): Path<(Uuid, String)>,
    Json(request): Json<UpdateAgentRequest>,
) -> ApiResult<Json<Agent>> {
    let mut group = fetch_group(&state, id).await?;

    if let Some(new_name) = &request.name {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(bad_request("Agent name must not be empty"));
        }
        if new_name != name && group.agent(new_name).is_some() {
            return Err(bad_request(format!(
                "Agent {} already exists in group",
                new_name
            )));
        }
    }

    let Some(agent) = group.agent_mut(&name) else {
        return Err(not_found(format!("Agent {} not found", name)));
    };
    if let Some(new_name) = request.name {
        agent.rename(new_name.trim());
    }
    if let Some(model) = request.model {
        agent.model = model;
    }
    if let Some(system_prompt) = request.system_prompt {
        agent.system_prompt = system_prompt;
    }
    if let Some(tools) = request.tools {
        agent.tools = tools;
    }
    if let Some(memory_limit) = request.memory_limit {
        agent.memory_limit = memory_limit;
    }
    let updated = agent.clone();

    state.store.upsert_group(group).await.map_err(internal)?;
    Ok(Json(updated))
}

pub(super) async fn remove_agent(
    State(state): State<Arc<AppState>>,
    Path((id, name)): Path<(Uuid, String)>,
) -> ApiResult<StatusCode> {
    let mut group = fetch_group(&state, id).await?;
    if !group.remove_agent(&name) {
        return Err(not_found(format!("Agent {} not found", name)));
    }
    state.store.upsert_group(group).await.map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn add_shared_memory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SharedMemoryRequest>,
) -> ApiResult<Json<AgentGroup>> {
    let mut group = fetch_group(&state, id).await?;
    group.add_shared_memory(request.content, &request.source);
    state
        .store
        .upsert_group(group.clone())
        .await
        .map_err(internal)?;
    Ok(Json(group))
}
