//! Worker loop and per-task processing

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::Shared;
use crate::tasks::{FileResult, TaskId, TaskStatus};

/// How a dequeued task left the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Finished(TaskStatus),
    /// Shutdown was signalled between two URLs; the task stays `Processing`
    Interrupted,
    /// Unknown id or a task that could not start
    Skipped,
}

pub(crate) async fn run(worker_id: usize, shared: Arc<Shared>) {
    info!(worker_id, "Worker started");

    loop {
        let next = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => None,
            id = shared.queue.next() => id,
        };

        let Some(id) = next else {
            break;
        };

        debug!(worker_id, task_id = %id, "Worker picked up task");
        let outcome = process_task(&shared, worker_id, &id).await;
        debug!(worker_id, task_id = %id, ?outcome, "Worker done with task");
    }

    info!(worker_id, "Worker stopped");
}

pub(crate) async fn process_task(shared: &Shared, worker_id: usize, id: &TaskId) -> ProcessOutcome {
    let (urls, start) = {
        let mut tasks = shared.registry.write().await;
        let Some(task) = tasks.get_mut(id) else {
            warn!(worker_id, task_id = %id, "Dequeued task is not registered");
            return ProcessOutcome::Skipped;
        };

        if let Err(e) = task.transition(TaskStatus::Processing) {
            warn!(worker_id, task_id = %id, error = %e, "Dequeued task cannot start");
            return ProcessOutcome::Skipped;
        }
        shared.persist(task).await;

        (task.urls.clone(), task.next_url_index())
    };

    info!(
        worker_id,
        task_id = %id,
        urls = urls.len(),
        resume_at = start,
        "Processing task"
    );

    for url in urls.iter().skip(start) {
        if shared.cancel.is_cancelled() {
            info!(worker_id, task_id = %id, "Task interrupted by shutdown");
            shared.metrics.task_interrupted();
            return ProcessOutcome::Interrupted;
        }

        let result = match shared.downloader.fetch(url).await {
            Ok(result) => {
                shared.metrics.url_downloaded();
                debug!(worker_id, task_id = %id, url = %url, "URL downloaded");
                FileResult {
                    url: url.clone(),
                    ..result
                }
            }
            Err(e) => {
                shared.metrics.url_failed();
                warn!(worker_id, task_id = %id, url = %url, error = %e, "URL download failed");
                FileResult::failure(url.as_str(), e.to_string())
            }
        };

        let mut tasks = shared.registry.write().await;
        let Some(task) = tasks.get_mut(id) else {
            error!(worker_id, task_id = %id, "Task vanished from registry mid-processing");
            return ProcessOutcome::Skipped;
        };
        if let Err(e) = task.record_result(result) {
            error!(worker_id, task_id = %id, error = %e, "Could not record result");
            return ProcessOutcome::Skipped;
        }
        shared.persist(task).await;
    }

    let mut tasks = shared.registry.write().await;
    let Some(task) = tasks.get_mut(id) else {
        error!(worker_id, task_id = %id, "Task vanished from registry mid-processing");
        return ProcessOutcome::Skipped;
    };

    match task.finalize() {
        Ok(status) => {
            shared.persist(task).await;
            match status {
                TaskStatus::Completed => shared.metrics.task_completed(),
                _ => shared.metrics.task_failed(),
            }
            info!(
                worker_id,
                task_id = %id,
                %status,
                errors = task.error_count(),
                "Task finished"
            );
            ProcessOutcome::Finished(status)
        }
        Err(e) => {
            error!(worker_id, task_id = %id, error = %e, "Could not finalize task");
            ProcessOutcome::Skipped
        }
    }
}
