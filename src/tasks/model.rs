use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use super::validation::{ValidationError, validate_urls};

/// Opaque task identifier (UUIDv4 string form)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Forward edges of the lifecycle. Terminal states have none.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Processing)
                | (TaskStatus::Processing, TaskStatus::Completed)
                | (TaskStatus::Processing, TaskStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("illegal status transition {from} -> {to}")]
    IllegalTransition { from: TaskStatus, to: TaskStatus },

    #[error("cannot record a result while task is {0}")]
    NotProcessing(TaskStatus),

    #[error("all {0} urls already have results")]
    ResultsFull(usize),

    #[error("cannot finalize with {attempted} of {total} urls attempted")]
    Incomplete { attempted: usize, total: usize },

    #[error("task is already {0}")]
    AlreadyFinished(TaskStatus),
}

/// Outcome of one attempted URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResult {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileResult {
    pub fn success(url: impl Into<String>, file_name: impl Into<String>, size: u64) -> Self {
        Self {
            url: url.into(),
            file_name: Some(file_name.into()),
            error: None,
            size: Some(size),
        }
    }

    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: None,
            error: Some(error.into()),
            size: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A submitted batch of URLs tracked as one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    pub id: TaskId,
    pub urls: Vec<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub results: Vec<FileResult>,
}

impl DownloadTask {
    /// Validate `urls` and build a fresh `Pending` task
    pub fn new(urls: Vec<String>) -> Result<Self, ValidationError> {
        validate_urls(&urls)?;

        let now = Utc::now();
        Ok(Self {
            id: TaskId::new(),
            results: Vec::with_capacity(urls.len()),
            urls,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn transition(&mut self, next: TaskStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::IllegalTransition {
                from: self.status,
                to: next,
            });
        }

        self.set_status(next);
        Ok(())
    }

    /// Append the result for the next unattempted URL
    pub fn record_result(&mut self, result: FileResult) -> Result<(), TransitionError> {
        if self.status != TaskStatus::Processing {
            return Err(TransitionError::NotProcessing(self.status));
        }
        if self.results.len() >= self.urls.len() {
            return Err(TransitionError::ResultsFull(self.urls.len()));
        }

        self.results.push(result);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Move to `Completed` or `Failed` once every URL has a result
    pub fn finalize(&mut self) -> Result<TaskStatus, TransitionError> {
        if self.results.len() != self.urls.len() {
            return Err(TransitionError::Incomplete {
                attempted: self.results.len(),
                total: self.urls.len(),
            });
        }

        let next = if self.results.iter().any(FileResult::is_error) {
            TaskStatus::Failed
        } else {
            TaskStatus::Completed
        };

        self.transition(next)?;
        Ok(next)
    }

    /// Put an unfinished task back to `Pending` after a restart.
    ///
    /// This is the only backwards edge and exists for recovery: partial
    /// results are kept and processing resumes at `next_url_index`.
    pub fn reset_for_restore(&mut self) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::AlreadyFinished(self.status));
        }

        self.set_status(TaskStatus::Pending);
        Ok(())
    }

    /// Index of the first URL without a result
    pub fn next_url_index(&self) -> usize {
        self.results.len()
    }

    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_error()).count()
    }

    fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
