//! HTTP downloader built on reqwest

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Proxy, header::CONTENT_DISPOSITION};
use std::time::Duration;
use tracing::{debug, warn};

use super::filename::{fallback_file_name, file_name_from_disposition, file_name_from_url};
use super::{DownloadError, Downloader, Result};
use crate::config::DownloaderConfig;
use crate::storage::ArtifactStore;
use crate::tasks::FileResult;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub proxy: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30 * 60),
            user_agent: concat!("batchfetch/", env!("CARGO_PKG_VERSION")).to_string(),
            proxy: None,
        }
    }
}

impl From<&DownloaderConfig> for HttpConfig {
    fn from(config: &DownloaderConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            user_agent: config.user_agent.clone(),
            proxy: config.proxy.clone(),
        }
    }
}

/// Fetches a URL with one GET and writes the body to an [`ArtifactStore`]
pub struct HttpDownloader {
    client: Client,
    artifacts: ArtifactStore,
}

impl HttpDownloader {
    pub fn new(config: HttpConfig, artifacts: ArtifactStore) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(url) = config.proxy.as_deref() {
            let proxy = Proxy::all(url)
                .map_err(|e| DownloadError::InvalidUrl(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| DownloadError::RequestFailed(e.to_string()))?;

        Ok(Self { client, artifacts })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, url: &str) -> Result<FileResult> {
        debug!(url, "Starting download");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::Timeout
            } else if e.is_redirect() {
                DownloadError::TooManyRedirects
            } else if e.is_builder() {
                DownloadError::InvalidUrl(e.to_string())
            } else {
                DownloadError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(DownloadError::HttpStatus {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(file_name_from_disposition)
            .or_else(|| file_name_from_url(response.url()))
            .unwrap_or_else(fallback_file_name);

        let mut writer = self.artifacts.writer(&file_name).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let written = match chunk {
                Ok(chunk) => writer.write(chunk).await.map_err(DownloadError::from),
                Err(e) => Err(body_error(e)),
            };

            if let Err(e) = written {
                if let Err(abort_err) = writer.abort().await {
                    warn!(
                        url,
                        file_name = %file_name,
                        error = %abort_err,
                        "Failed to abort partial upload"
                    );
                }
                return Err(e);
            }
        }

        let size = writer.finish().await?;
        debug!(url, file_name = %file_name, size, "Download completed");

        Ok(FileResult::success(url, file_name, size))
    }
}

fn body_error(e: reqwest::Error) -> DownloadError {
    if e.is_timeout() {
        DownloadError::Timeout
    } else {
        DownloadError::RequestFailed(format!("Failed to read body: {}", e))
    }
}
