//! In-memory group store (non-persistent).

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{GroupStore, StoreError};
use crate::agents::AgentGroup;
use async_trait::async_trait;

/// Group store backed by a process-local map. Used in tests and when no
/// data directory is configured.
#[derive(Clone, Default)]
pub struct InMemoryGroupStore {
    groups: Arc<RwLock<HashMap<Uuid, AgentGroup>>>,
}

impl InMemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupStore for InMemoryGroupStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn list_groups(&self) -> Result<Vec<AgentGroup>, StoreError> {
        let mut groups: Vec<AgentGroup> = self.groups.read().await.values().cloned().collect();
        groups.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(groups)
    }

    async fn get_group(&self, id: Uuid) -> Result<Option<AgentGroup>, StoreError> {
        Ok(self.groups.read().await.get(&id).cloned())
    }

    async fn upsert_group(&self, group: AgentGroup) -> Result<(), StoreError> {
        self.groups.write().await.insert(group.id, group);
        Ok(())
    }

    async fn delete_group(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.groups.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_list() {
        let store = InMemoryGroupStore::new();
        assert!(!store.is_persistent());

        let group = AgentGroup::new("Crew", "test crew");
        let id = group.id;
        store.upsert_group(group).await.unwrap();

        assert_eq!(store.list_groups().await.unwrap().len(), 1);
        assert!(store.get_group(id).await.unwrap().is_some());
        assert!(store.delete_group(id).await.unwrap());
        assert!(store.list_groups().await.unwrap().is_empty());
    }
}
