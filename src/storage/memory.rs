use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{Result, StoreError, TaskStore};
use crate::tasks::{DownloadTask, TaskId};

/// In-process task store
///
/// Nothing survives the process. Useful for tests: it counts saves and can be
/// told to fail them.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: RwLock<HashMap<TaskId, DownloadTask>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing snapshots, as if left behind by a previous run
    pub fn with_tasks(tasks: impl IntoIterator<Item = DownloadTask>) -> Self {
        let map = tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self {
            tasks: RwLock::new(map),
            ..Self::default()
        }
    }

    /// Number of successful `save` calls so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn save(&self, task: &DownloadTask) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("saves disabled".to_string()));
        }

        self.tasks
            .write()
            .await
            .insert(task.id.clone(), task.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self, id: &TaskId) -> Result<DownloadTask> {
        self.tasks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn load_all(&self) -> Result<HashMap<TaskId, DownloadTask>> {
        Ok(self.tasks.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failing_saves_are_not_recorded() {
        let store = MemoryStore::new();
        let task = DownloadTask::new(vec!["http://a/x".to_string()]).unwrap();

        store.set_fail_saves(true);
        assert!(store.save(&task).await.is_err());
        assert!(store.is_empty().await);

        store.set_fail_saves(false);
        store.save(&task).await.unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load(&task.id).await.unwrap(), task);
    }
}
