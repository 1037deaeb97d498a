//! JSON file-based group store.
//!
//! Keeps the full group graph in memory and rewrites the whole file after
//! every mutation, the same shape the control panel persists: a JSON array
//! of groups. Before each overwrite the previous file is copied to
//! `<file>.bak`, so one generation of history survives a bad write.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{GroupStore, StoreError};
use crate::agents::AgentGroup;
use async_trait::async_trait;

#[derive(Clone)]
pub struct FileGroupStore {
    path: PathBuf,
    groups: Arc<RwLock<HashMap<Uuid, AgentGroup>>>,
    persist_lock: Arc<Mutex<()>>,
}

impl FileGroupStore {
    /// Open (or create) the store at `base_dir/agent_groups.json`.
    ///
    /// A missing file starts an empty collection; an unreadable or
    /// unparseable file is logged and also starts empty rather than
    /// blocking startup.
    pub async fn new(base_dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&base_dir).await?;
        let path = base_dir.join("agent_groups.json");

        let groups = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<AgentGroup>>(&bytes) {
                Ok(list) => {
                    tracing::info!("Loaded {} agent groups from {}", list.len(), path.display());
                    list.into_iter().map(|g| (g.id, g)).collect()
                }
                Err(e) => {
                    tracing::warn!("Failed to parse group store {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "Group store not found at {}. Starting with empty list.",
                    path.display()
                );
                HashMap::new()
            }
            Err(err) => {
                tracing::warn!("Failed to read group store {}: {}", path.display(), err);
                HashMap::new()
            }
        };

        Ok(Self {
            path,
            groups: Arc::new(RwLock::new(groups)),
            persist_lock: Arc::new(Mutex::new(())),
        })
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let _guard = self.persist_lock.lock().await;

        let mut list: Vec<AgentGroup> = self.groups.read().await.values().cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let data = serde_json::to_vec_pretty(&list)?;

        // Back up the previous version before overwriting.
        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let bak_path = self.path.with_extension("json.bak");
            if let Err(e) = fs::copy(&self.path, &bak_path).await {
                tracing::warn!("Failed to write backup {}: {}", bak_path.display(), e);
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data).await?;
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl GroupStore for FileGroupStore {
    fn is_persistent(&self) -> bool {
        true
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
        self.persist().await
    }

    async fn delete_group(&self, id: Uuid) -> Result<bool, StoreError> {
        let removed = self.groups.write().await.remove(&id).is_some();
        self.persist().await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::history::{HistoryEntry, HistoryKind};
    use crate::agents::Agent;
    use serde_json::json;

    fn sample_group() -> AgentGroup {
        let mut group = AgentGroup::new("Research", "A research crew");
        let mut alice = Agent::new("Alice", "llama2", "You research things.", vec![]);
        alice.add_to_memory("Task: find sources", "task");
        group.add_agent(alice);

        let parent = HistoryEntry::new(
            HistoryKind::SingleAgentExecution,
            "find sources",
            vec!["Alice".into()],
            json!({"status": "success", "response": "found them"}),
            10,
            None,
        );
        let parent_id = parent.id;
        group.add_to_history(parent);
        group.add_to_history(HistoryEntry::new(
            HistoryKind::SingleAgentExecution,
            "summarize sources",
            vec!["Alice".into()],
            json!({"status": "success", "response": "summary"}),
            12,
            Some(parent_id),
        ));
        group
    }

    #[tokio::test]
    async fn test_round_trip_preserves_full_graph() {
        let dir = tempfile::tempdir().unwrap();
        let group = sample_group();
        let group_id = group.id;

        {
            let store = FileGroupStore::new(dir.path().to_path_buf()).await.unwrap();
            store.upsert_group(group.clone()).await.unwrap();
        }

        // Reopen from disk.
        let store = FileGroupStore::new(dir.path().to_path_buf()).await.unwrap();
        let loaded = store.get_group(group_id).await.unwrap().unwrap();

        assert_eq!(loaded.name, group.name);
        assert_eq!(loaded.agents.len(), 1);
        assert_eq!(loaded.agents[0].memory, group.agents[0].memory);
        assert_eq!(loaded.history.len(), 2);
        assert_eq!(loaded.history[1].parent_id, Some(group.history[0].id));
    }

    #[tokio::test]
    async fn test_backup_written_before_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileGroupStore::new(dir.path().to_path_buf()).await.unwrap();

        let group = sample_group();
        store.upsert_group(group.clone()).await.unwrap();

        let bak = dir.path().join("agent_groups.json.bak");
        assert!(!bak.exists());

        let mut renamed = group.clone();
        renamed.name = "Research v2".to_string();
        store.upsert_group(renamed).await.unwrap();

        // The backup holds the previous generation.
        assert!(bak.exists());
        let previous: Vec<AgentGroup> =
            serde_json::from_slice(&std::fs::read(&bak).unwrap()).unwrap();
        assert_eq!(previous[0].name, "Research");
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("agent_groups.json"), b"{not json").unwrap();

        let store = FileGroupStore::new(dir.path().to_path_buf()).await.unwrap();
        assert!(store.list_groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_group() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileGroupStore::new(dir.path().to_path_buf()).await.unwrap();
        let group = sample_group();
        let id = group.id;
        store.upsert_group(group).await.unwrap();

        assert!(store.delete_group(id).await.unwrap());
        assert!(!store.delete_group(id).await.unwrap());
        assert!(store.get_group(id).await.unwrap().is_none());
    }
}
