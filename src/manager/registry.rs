use std::collections::HashMap;
use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::tasks::{DownloadTask, TaskId, TaskStatus};

/// Authoritative in-process task table
///
/// One lock covers the whole map. Reads hand out clones, so a caller never
/// holds a reference into a task that a worker is about to mutate.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<TaskId, DownloadTask>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, task: DownloadTask) {
        self.tasks.write().await.insert(task.id.clone(), task);
    }

    pub async fn get(&self, id: &TaskId) -> Option<DownloadTask> {
        self.tasks.read().await.get(id).cloned()
    }

    /// Every task, oldest first
    pub async fn list(&self) -> Vec<DownloadTask> {
        let mut tasks: Vec<_> = self.tasks.read().await.values().cloned().collect();
        tasks.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        tasks
    }

    pub async fn status_counts(&self) -> HashMap<TaskStatus, usize> {
        let tasks = self.tasks.read().await;
        let mut counts = HashMap::new();
        for task in tasks.values() {
            *counts.entry(task.status).or_insert(0) += 1;
        }
        counts
    }

    /// Exclusive access for multi-step mutations
    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, HashMap<TaskId, DownloadTask>> {
        self.tasks.write().await
    }
}
