//! Persistence for task snapshots and downloaded artifacts
//!
//! [`TaskStore`] is the capability the task manager writes through to after
//! every state change. Three backends implement it:
//!
//! - [`FileStore`] - one JSON file per task, temp file + atomic rename
//! - [`FjallStore`] - embedded LSM keyspace
//! - [`MemoryStore`] - in-process map for tests and throwaway runs
//!
//! [`ArtifactStore`] holds the downloaded file bodies (object_store backed).

mod artifacts;
mod file;
mod ledger;
mod memory;

pub use artifacts::{ArtifactError, ArtifactStore, ArtifactWriter};
pub use file::FileStore;
pub use ledger::FjallStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::tasks::{DownloadTask, TaskId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable storage of task snapshots
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert or overwrite the snapshot for `task.id`
    async fn save(&self, task: &DownloadTask) -> Result<()>;

    /// Fetch one snapshot, `StoreError::NotFound` when absent
    async fn load(&self, id: &TaskId) -> Result<DownloadTask>;

    /// Every stored snapshot keyed by id
    async fn load_all(&self) -> Result<HashMap<TaskId, DownloadTask>>;
}
