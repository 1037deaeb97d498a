//! Agent-group storage with pluggable backends.
//!
//! The store is the process-wide registry of groups and the persistence
//! boundary: orchestration persists the mutated group after every history
//! append. Backends:
//! - `memory`: in-memory storage (non-persistent, for tests)
//! - `file`: JSON file on disk with a `.bak` backup of the previous version

mod file;
mod memory;

pub use file::FileGroupStore;
pub use memory::InMemoryGroupStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::agents::AgentGroup;

/// Error from a store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Group store trait - implemented by all storage backends.
///
/// Must round-trip the full group→agent→memory→history graph, including
/// `parent_id` links.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// All groups, oldest first.
    async fn list_groups(&self) -> Result<Vec<AgentGroup>, StoreError>;

    async fn get_group(&self, id: Uuid) -> Result<Option<AgentGroup>, StoreError>;

    /// Insert or replace a group and persist the collection.
    async fn upsert_group(&self, group: AgentGroup) -> Result<(), StoreError>;

    /// Remove a group. Returns whether it existed.
    async fn delete_group(&self, id: Uuid) -> Result<bool, StoreError>;
}
