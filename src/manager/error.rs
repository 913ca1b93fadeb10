use thiserror::Error;

use crate::storage::StoreError;
use crate::tasks::{TaskId, ValidationError};

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Work queue is full")]
    QueueFull,

    #[error("Task manager is shutting down")]
    ShuttingDown,

    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("Failed to persist task: {0}")]
    Persistence(#[source] StoreError),

    #[error("Failed to load persisted tasks: {0}")]
    Restore(#[source] StoreError),
}

pub type Result<T> = std::result::Result<T, ManagerError>;
