//! HTTP route handlers and server setup.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::agents::ContinuationTracker;
use crate::config::Config;
use crate::llm::{LlmClient, ModelInfo, OllamaClient};
use crate::store::{FileGroupStore, GroupStore, StoreError};

use super::groups;
use super::tasks;
use super::types::*;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Group persistence backend
    pub store: Arc<dyn GroupStore>,
    /// Completion service client
    pub client: Arc<dyn LlmClient>,
    /// Per-group continuation state for the current server session
    pub trackers: RwLock<HashMap<Uuid, ContinuationTracker>>,
}

pub(super) type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

pub(super) fn not_found(message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub(super) fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub(super) fn internal(err: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!("Store error: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

pub(super) fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/models", get(list_models))
        .route("/api/groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/api/groups/:id",
            get(groups::get_group).delete(groups::delete_group),
        )
        .route("/api/groups/:id/agents", post(groups::add_agent))
        .route(
            "/api/groups/:id/agents/:name",
            axum::routing::put(groups::update_agent).delete(groups::remove_agent),
        )
        .route("/api/groups/:id/memory", post(groups::add_shared_memory))
        .route(
            "/api/groups/:id/execute/manager",
            post(tasks::execute_manager),
        )
        .route("/api/groups/:id/execute/agent", post(tasks::execute_agent))
        .route("/api/groups/:id/execute/multi", post(tasks::execute_multi))
        .route(
            "/api/groups/:id/execute/directives",
            post(tasks::execute_directives),
        )
        .route("/api/groups/:id/history", get(tasks::get_history))
        .route(
            "/api/groups/:id/history/:entry_id/chain",
            get(tasks::get_chain),
        )
        .route(
            "/api/groups/:id/history/:entry_id/continue",
            post(tasks::prepare_continuation),
        )
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store: Arc<dyn GroupStore> =
        Arc::new(FileGroupStore::new(config.data_dir.clone()).await?);
    let client: Arc<dyn LlmClient> = Arc::new(OllamaClient::new(config.ollama_url.clone()));

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        client,
        trackers: RwLock::new(HashMap::new()),
    });

    let app = router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::clone(&state));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ollama_url: state.config.ollama_url.clone(),
        persistent_store: state.store.is_persistent(),
    })
}

/// List models available on the Ollama server.
async fn list_models(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<ModelInfo>>> {
    match state.client.list_models().await {
        Ok(models) => Ok(Json(models)),
        Err(e) => {
            tracing::error!("Failed to list models: {}", e);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

/// Fetch a group or produce a 404.
pub(super) async fn fetch_group(
    state: &AppState,
    id: Uuid,
) -> ApiResult<crate::agents::AgentGroup> {
    state
        .store
        .get_group(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("Group {} not found", id)))
}
