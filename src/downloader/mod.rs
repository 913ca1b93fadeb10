//! URL fetch capability
//!
//! The task manager calls [`Downloader::fetch`] once per URL and records
//! whatever comes back. No retries happen at this layer or above it.

mod filename;
mod http;

pub use filename::{file_name_from_disposition, file_name_from_url, sanitize_file_name};
pub use http::{HttpConfig, HttpDownloader};

use async_trait::async_trait;
use thiserror::Error;

use crate::storage::ArtifactError;
use crate::tasks::FileResult;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Too many redirects")]
    TooManyRedirects,

    #[error("HTTP status {code}: {reason}")]
    HttpStatus { code: u16, reason: String },

    #[error("failed to write file: {0}")]
    Write(#[from] ArtifactError),
}

pub type Result<T> = std::result::Result<T, DownloadError>;

/// Fetches a single URL and stores its body
#[async_trait]
pub trait Downloader: Send + Sync {
    /// On success the returned result carries `file_name` and `size`
    async fn fetch(&self, url: &str) -> Result<FileResult>;
}
