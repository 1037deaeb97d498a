//! HTTP API for the agent panel.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `GET /api/models` - List models available on the Ollama server
//! - `GET /api/groups` - List agent groups
//! - `POST /api/groups` - Create a group
//! - `GET /api/groups/{id}` - Get a group with agents, memory, and history
//! - `DELETE /api/groups/{id}` - Delete a group
//! - `POST /api/groups/{id}/agents` - Add an agent to a group
//! - `PUT /api/groups/{id}/agents/{name}` - Update an agent (rename re-resolves role)
//! - `DELETE /api/groups/{id}/agents/{name}` - Remove an agent
//! - `POST /api/groups/{id}/memory` - Append a shared-memory entry
//! - `POST /api/groups/{id}/execute/manager` - Manager-coordinated execution
//! - `POST /api/groups/{id}/execute/agent` - Single-agent execution
//! - `POST /api/groups/{id}/execute/multi` - Multi-agent fan-out
//! - `POST /api/groups/{id}/execute/directives` - Inline `@Name:` directive execution
//! - `GET /api/groups/{id}/history` - Execution history
//! - `GET /api/groups/{id}/history/{entry_id}/chain` - Continuation chain of an entry
//! - `POST /api/groups/{id}/history/{entry_id}/continue` - Prepare a continuation

mod groups;
mod routes;
mod tasks;
pub mod types;

pub use routes::{serve, AppState};
pub use types::*;
