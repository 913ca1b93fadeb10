use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Result, StoreError, TaskStore};
use crate::tasks::{DownloadTask, TaskId};

const FILE_PREFIX: &str = "task_";
const FILE_SUFFIX: &str = ".json";
const TMP_SUFFIX: &str = ".tmp";

/// Directory of `task_<id>.json` records.
///
/// Writes go to `task_<id>.json.tmp` first and are renamed over the final
/// name, so a reader sees either the previous record or the new one.
pub struct FileStore {
    dir: PathBuf,
    // serialises writers so two saves of one id never share a temp file
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        info!(path = %dir.display(), "Opened file task store");

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn task_path(&self, id: &TaskId) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{id}{FILE_SUFFIX}"))
    }

    fn is_task_file(name: &str) -> bool {
        name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX)
    }

    async fn read_record(path: &Path) -> Result<DownloadTask> {
        let data = fs::read(path).await?;
        Ok(serde_json::from_slice(&data)?)
    }
}

#[async_trait]
impl TaskStore for FileStore {
    async fn save(&self, task: &DownloadTask) -> Result<()> {
        let data = serde_json::to_vec_pretty(task)?;
        let final_path = self.task_path(&task.id);
        let mut tmp_path = final_path.clone().into_os_string();
        tmp_path.push(TMP_SUFFIX);

        let _guard = self.write_lock.lock().await;
        fs::write(&tmp_path, &data).await?;
        fs::rename(&tmp_path, &final_path).await?;

        debug!(task_id = %task.id, status = %task.status, "Saved task record");
        Ok(())
    }

    async fn load(&self, id: &TaskId) -> Result<DownloadTask> {
        match Self::read_record(&self.task_path(id)).await {
            Err(StoreError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.clone()))
            }
            other => other,
        }
    }

    async fn load_all(&self) -> Result<HashMap<TaskId, DownloadTask>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut tasks = HashMap::new();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !Self::is_task_file(name) || !entry.file_type().await?.is_file() {
                continue;
            }

            let path = entry.path();
            match Self::read_record(&path).await {
                Ok(task) => {
                    tasks.insert(task.id.clone(), task);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable task record");
                }
            }
        }

        debug!(count = tasks.len(), "Loaded task records");
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{FileResult, TaskStatus};
    use tempfile::TempDir;

    fn sample_task() -> DownloadTask {
        DownloadTask::new(vec!["http://a/x".into(), "http://b/y".into()]).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        let mut task = sample_task();
        store.save(&task).await.unwrap();

        task.transition(TaskStatus::Processing).unwrap();
        task.record_result(FileResult::success("http://a/x", "x", 10))
            .unwrap();
        store.save(&task).await.unwrap();

        let loaded = store.load(&task.id).await.unwrap();
        assert_eq!(loaded, task);
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        let err = store.load(&TaskId::from("missing")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id.as_str() == "missing"));
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        let task = sample_task();
        store.save(&task).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![format!("task_{}.json", task.id)]);
    }

    #[tokio::test]
    async fn test_load_all_skips_foreign_and_corrupt_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        let first = sample_task();
        let second = sample_task();
        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        std::fs::write(temp_dir.path().join("task_broken.json"), b"{not json").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), b"hello").unwrap();
        std::fs::write(temp_dir.path().join("task_stale.json.tmp"), b"{}").unwrap();

        let all = store.load_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[&first.id], first);
        assert_eq!(all[&second.id], second);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let task = sample_task();

        {
            let store = FileStore::open(temp_dir.path()).unwrap();
            store.save(&task).await.unwrap();
        }

        let store = FileStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.load(&task.id).await.unwrap(), task);
    }
}
