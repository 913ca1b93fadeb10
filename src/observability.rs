//! Process-local counters, logged at debug level as they move

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    tasks_created: AtomicU64,
    tasks_rejected: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_interrupted: AtomicU64,
    urls_downloaded: AtomicU64,
    urls_failed: AtomicU64,
    persist_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_created(&self) {
        self.incr(&self.tasks_created, "tasks_created");
    }

    pub fn task_rejected(&self) {
        self.incr(&self.tasks_rejected, "tasks_rejected");
    }

    pub fn task_completed(&self) {
        self.incr(&self.tasks_completed, "tasks_completed");
    }

    pub fn task_failed(&self) {
        self.incr(&self.tasks_failed, "tasks_failed");
    }

    pub fn task_interrupted(&self) {
        self.incr(&self.tasks_interrupted, "tasks_interrupted");
    }

    pub fn url_downloaded(&self) {
        self.incr(&self.urls_downloaded, "urls_downloaded");
    }

    pub fn url_failed(&self) {
        self.incr(&self.urls_failed, "urls_failed");
    }

    pub fn persist_failed(&self) {
        self.incr(&self.persist_failures, "persist_failures");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_created: self.tasks_created.load(Ordering::Relaxed),
            tasks_rejected: self.tasks_rejected.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_interrupted: self.tasks_interrupted.load(Ordering::Relaxed),
            urls_downloaded: self.urls_downloaded.load(Ordering::Relaxed),
            urls_failed: self.urls_failed.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
        }
    }

    fn incr(&self, counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = name, "Metric incremented");
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub tasks_created: u64,
    pub tasks_rejected: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_interrupted: u64,
    pub urls_downloaded: u64,
    pub urls_failed: u64,
    pub persist_failures: u64,
}
