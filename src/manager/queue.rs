use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

use crate::tasks::TaskId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("queue is full (capacity {0})")]
    Full(usize),

    #[error("queue is closed")]
    Closed,
}

/// Bounded FIFO of task ids shared by every worker
///
/// Senders never wait: a full buffer is reported straight back to the
/// caller. The receiver sits behind a mutex so each id is handed to
/// exactly one worker.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    sender: mpsc::Sender<TaskId>,
    receiver: Arc<Mutex<mpsc::Receiver<TaskId>>>,
}

/// A reserved slot; dropping it unused gives the capacity back
pub struct QueueSlot<'a> {
    permit: mpsc::Permit<'a, TaskId>,
}

impl QueueSlot<'_> {
    pub fn send(self, id: TaskId) {
        self.permit.send(id);
    }
}

impl WorkQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Claim room for one id without waiting
    pub fn try_reserve(&self) -> Result<QueueSlot<'_>, EnqueueError> {
        self.sender
            .try_reserve()
            .map(|permit| QueueSlot { permit })
            .map_err(|e| self.classify(e))
    }

    pub fn try_enqueue(&self, id: TaskId) -> Result<(), EnqueueError> {
        self.sender.try_send(id).map_err(|e| self.classify(e))
    }

    /// Wait for the next id. Cancel safe: dropping the future loses nothing.
    pub async fn next(&self) -> Option<TaskId> {
        self.receiver.lock().await.recv().await
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    /// Ids waiting plus slots reserved but not yet filled
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn classify<T>(&self, err: mpsc::error::TrySendError<T>) -> EnqueueError {
        match err {
            mpsc::error::TrySendError::Full(_) => EnqueueError::Full(self.capacity()),
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        }
    }
}
