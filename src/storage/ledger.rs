use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{Result, StoreError, TaskStore};
use crate::tasks::{DownloadTask, TaskId};

const TASK_KEY_PREFIX: &str = "task:";

/// Encode a task key: task:{id}
fn encode_task_key(id: &TaskId) -> Vec<u8> {
    format!("{TASK_KEY_PREFIX}{id}").into_bytes()
}

/// Fjall-backed task snapshots
///
/// Partition layout:
/// - `tasks`: task:{id} -> DownloadTask (JSON)
#[derive(Clone)]
pub struct FjallStore {
    keyspace: Keyspace,
    tasks: PartitionHandle,
}

impl FjallStore {
    /// Open or create a Fjall store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening Fjall task store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let tasks = keyspace.open_partition("tasks", PartitionCreateOptions::default())?;

        Ok(Self { keyspace, tasks })
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }
}

/// Run a fjall call on the blocking pool
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Unavailable(format!("fjall task panicked: {e}")))?
}

#[async_trait]
impl TaskStore for FjallStore {
    async fn save(&self, task: &DownloadTask) -> Result<()> {
        let key = encode_task_key(&task.id);
        let value = serde_json::to_vec(task)?;
        let tasks = self.tasks.clone();

        blocking(move || Ok(tasks.insert(key, value)?)).await?;
        debug!(task_id = %task.id, status = %task.status, "Upserted task");
        Ok(())
    }

    async fn load(&self, id: &TaskId) -> Result<DownloadTask> {
        let key = encode_task_key(id);
        let tasks = self.tasks.clone();

        match blocking(move || Ok(tasks.get(key)?)).await? {
            Some(value) => Ok(serde_json::from_slice(&value)?),
            None => Err(StoreError::NotFound(id.clone())),
        }
    }

    async fn load_all(&self) -> Result<HashMap<TaskId, DownloadTask>> {
        let partition = self.tasks.clone();

        blocking(move || {
            let mut tasks = HashMap::new();

            for item in partition.prefix(TASK_KEY_PREFIX) {
                let (key, value) = item?;
                match serde_json::from_slice::<DownloadTask>(&value) {
                    Ok(task) => {
                        tasks.insert(task.id.clone(), task);
                    }
                    Err(e) => {
                        warn!(
                            key = %String::from_utf8_lossy(&key),
                            error = %e,
                            "Skipping undecodable task record"
                        );
                    }
                }
            }

            Ok(tasks)
        })
        .await
    }
}
