//! Request and response bodies of the HTTP API
//!
//! Tasks are returned as [`DownloadTask`](crate::tasks::DownloadTask) JSON
//! directly:
//!
//! ```json
//! {
//!   "id": "1d0c6a3e-6a38-4c1e-9f5e-3f6b0c2a8f11",
//!   "urls": ["http://a/x", "http://b/y"],
//!   "status": "failed",
//!   "created_at": "2024-05-01T10:00:00Z",
//!   "updated_at": "2024-05-01T10:00:02Z",
//!   "results": [
//!     {"url": "http://a/x", "file_name": "x", "size": 100},
//!     {"url": "http://b/y", "error": "timeout"}
//!   ]
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::observability::MetricsSnapshot;

/// Body of `POST /tasks`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateTaskRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub components: BTreeMap<&'static str, &'static str>,
    pub workers: usize,
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub tasks: BTreeMap<&'static str, usize>,
    pub metrics: MetricsSnapshot,
}
