//! Task manager: registry, bounded work queue and worker pool
//!
//! [`TaskManager`] is the only entry point the serving layer talks to.
//! Every state change on a task happens under the registry's write lock and
//! is written through to the [`TaskStore`] before the lock is released.
//! Persistence failures during processing are logged and counted; the
//! registry stays authoritative for the running process.
//!
//! Startup calls [`TaskManager::restore_tasks`] once, termination calls
//! [`TaskManager::shutdown`] once.

mod error;
mod queue;
mod registry;
mod worker;

pub use error::{ManagerError, Result};
pub use queue::{EnqueueError, QueueSlot, WorkQueue};
pub use registry::TaskRegistry;
pub use worker::ProcessOutcome;

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ManagerConfig;
use crate::downloader::Downloader;
use crate::observability::{Metrics, MetricsSnapshot};
use crate::storage::TaskStore;
use crate::tasks::{DownloadTask, TaskId};

/// State shared between the manager handle and its workers
pub(crate) struct Shared {
    pub(crate) registry: TaskRegistry,
    pub(crate) store: Arc<dyn TaskStore>,
    pub(crate) downloader: Arc<dyn Downloader>,
    pub(crate) queue: WorkQueue,
    pub(crate) cancel: CancellationToken,
    pub(crate) metrics: Metrics,
    accepting: AtomicBool,
}

impl Shared {
    /// Write-through after a mutation; failures are logged, never propagated
    pub(crate) async fn persist(&self, task: &DownloadTask) {
        if let Err(e) = self.store.save(task).await {
            self.metrics.persist_failed();
            warn!(task_id = %task.id, status = %task.status, error = %e, "Failed to persist task");
        }
    }
}

/// What [`TaskManager::restore_tasks`] did with the persisted records
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    /// Records registered (terminal and unfinished)
    pub restored: usize,
    pub requeued: Vec<TaskId>,
    /// Unfinished tasks left `Pending` because the queue had no room
    pub orphaned: Vec<TaskId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every worker loop exited
    Stopped,
    /// The timeout elapsed with workers still running
    TimedOut,
}

/// Point-in-time view used by the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ManagerStats {
    pub accepting: bool,
    pub workers: usize,
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub tasks: BTreeMap<&'static str, usize>,
    pub metrics: MetricsSnapshot,
}

/// Cloneable handle to the task manager
#[derive(Clone)]
pub struct TaskManager {
    shared: Arc<Shared>,
    workers: Arc<Mutex<JoinSet<()>>>,
    worker_count: usize,
}

impl TaskManager {
    /// Build the manager and spawn `config.workers` worker loops.
    ///
    /// Must be called from within a tokio runtime. Zero workers is allowed
    /// and leaves every queued task waiting.
    pub fn new(
        config: &ManagerConfig,
        store: Arc<dyn TaskStore>,
        downloader: Arc<dyn Downloader>,
    ) -> Self {
        let shared = Arc::new(Shared {
            registry: TaskRegistry::new(),
            store,
            downloader,
            queue: WorkQueue::new(config.queue_capacity),
            cancel: CancellationToken::new(),
            metrics: Metrics::new(),
            accepting: AtomicBool::new(true),
        });

        let mut workers = JoinSet::new();
        for worker_id in 0..config.workers {
            workers.spawn(worker::run(worker_id, Arc::clone(&shared)));
        }

        info!(
            workers = config.workers,
            queue_capacity = shared.queue.capacity(),
            "Task manager started"
        );

        Self {
            shared,
            workers: Arc::new(Mutex::new(workers)),
            worker_count: config.workers,
        }
    }

    /// Validate, register, persist and queue a new task.
    ///
    /// A queue slot is claimed first, so a rejected submission leaves no
    /// registry entry and no stored record.
    pub async fn create_task(&self, urls: Vec<String>) -> Result<DownloadTask> {
        if !self.is_accepting() {
            return Err(ManagerError::ShuttingDown);
        }

        let task = DownloadTask::new(urls)?;

        let slot = match self.shared.queue.try_reserve() {
            Ok(slot) => slot,
            Err(EnqueueError::Full(capacity)) => {
                self.shared.metrics.task_rejected();
                warn!(capacity, "Rejecting task, work queue is full");
                return Err(ManagerError::QueueFull);
            }
            Err(EnqueueError::Closed) => return Err(ManagerError::ShuttingDown),
        };

        {
            let mut tasks = self.shared.registry.write().await;
            if let Err(e) = self.shared.store.save(&task).await {
                self.shared.metrics.persist_failed();
                error!(task_id = %task.id, error = %e, "Failed to persist new task");
                return Err(ManagerError::Persistence(e));
            }
            tasks.insert(task.id.clone(), task.clone());
            slot.send(task.id.clone());
        }

        self.shared.metrics.task_created();
        info!(task_id = %task.id, urls = task.urls.len(), "Task queued");

        Ok(task)
    }

    pub async fn get_task(&self, id: &TaskId) -> Result<DownloadTask> {
        self.shared
            .registry
            .get(id)
            .await
            .ok_or_else(|| ManagerError::NotFound(id.clone()))
    }

    /// Snapshot of every task, oldest first
    pub async fn list_tasks(&self) -> Vec<DownloadTask> {
        self.shared.registry.list().await
    }

    /// Register every persisted task and requeue the unfinished ones.
    ///
    /// Unfinished tasks go back to `Pending` with their partial results, so
    /// processing resumes at the first URL without a result. A task that
    /// does not fit in the queue stays registered and is reported in
    /// [`RestoreReport::orphaned`].
    pub async fn restore_tasks(&self) -> Result<RestoreReport> {
        let persisted = self
            .shared
            .store
            .load_all()
            .await
            .map_err(ManagerError::Restore)?;

        let mut persisted: Vec<_> = persisted.into_values().collect();
        persisted.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });

        let mut report = RestoreReport::default();
        let mut tasks = self.shared.registry.write().await;

        for mut task in persisted {
            if tasks.contains_key(&task.id) {
                debug!(task_id = %task.id, "Task already registered, skipping restore");
                continue;
            }

            report.restored += 1;
            let id = task.id.clone();

            if task.reset_for_restore().is_err() {
                tasks.insert(id, task);
                continue;
            }

            self.shared.persist(&task).await;
            tasks.insert(id.clone(), task);

            match self.shared.queue.try_enqueue(id.clone()) {
                Ok(()) => {
                    debug!(task_id = %id, "Restored task requeued");
                    report.requeued.push(id);
                }
                Err(e) => {
                    warn!(
                        task_id = %id,
                        error = %e,
                        "Restored task could not be requeued, leaving it pending"
                    );
                    report.orphaned.push(id);
                }
            }
        }

        info!(
            restored = report.restored,
            requeued = report.requeued.len(),
            orphaned = report.orphaned.len(),
            "Task restore finished"
        );

        Ok(report)
    }

    /// Stop accepting tasks, signal the workers and wait up to `timeout`
    /// for them to exit. Calling it again after it stopped returns at once.
    pub async fn shutdown(&self, timeout: Duration) -> ShutdownOutcome {
        info!(?timeout, "Shutting down task manager");
        self.shared.accepting.store(false, Ordering::SeqCst);
        self.shared.cancel.cancel();

        let mut workers = self.workers.lock().await;
        let drain = async {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    error!(error = %e, "Worker ended abnormally");
                }
            }
        };
        let drained = tokio::time::timeout(timeout, drain).await.is_ok();

        if drained {
            info!("All workers stopped");
            ShutdownOutcome::Stopped
        } else {
            warn!(remaining = workers.len(), "Shutdown timed out with workers still running");
            ShutdownOutcome::TimedOut
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.shared.accepting.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub async fn stats(&self) -> ManagerStats {
        let tasks = self
            .shared
            .registry
            .status_counts()
            .await
            .into_iter()
            .map(|(status, count)| (status.as_str(), count))
            .collect();

        ManagerStats {
            accepting: self.is_accepting(),
            workers: self.worker_count,
            queue_depth: self.shared.queue.len(),
            queue_capacity: self.shared.queue.capacity(),
            tasks,
            metrics: self.metrics(),
        }
    }
}
