use std::sync::Arc;
use std::time::Duration;

use batchfetch::api::{self, AppState};
use batchfetch::config::{Config, StorageBackend};
use batchfetch::downloader::HttpDownloader;
use batchfetch::manager::{ShutdownOutcome, TaskManager};
use batchfetch::storage::{ArtifactStore, FileStore, FjallStore, TaskStore};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn run(config: Config) -> Result<(), AnyError> {
    let (store, ledger): (Arc<dyn TaskStore>, Option<FjallStore>) = match config.storage.backend {
        StorageBackend::File => {
            info!(path = %config.storage.path.display(), "Opening file task store");
            let store = FileStore::open(&config.storage.path)
                .map_err(|e| format!("Failed to open file store: {}", e))?;
            (Arc::new(store), None)
        }
        StorageBackend::Fjall => {
            info!(path = %config.storage.path.display(), "Opening Fjall task store");
            let store = FjallStore::open(&config.storage.path)
                .map_err(|e| format!("Failed to open Fjall store: {}", e))?;
            (Arc::new(store.clone()), Some(store))
        }
    };

    info!(dir = %config.downloader.download_dir.display(), "Preparing download directory");
    let artifacts = ArtifactStore::local(&config.downloader.download_dir)
        .map_err(|e| format!("Failed to prepare download directory: {}", e))?;
    let downloader = HttpDownloader::new((&config.downloader).into(), artifacts)?;

    let manager = TaskManager::new(&config.manager, store, Arc::new(downloader));

    match manager.restore_tasks().await {
        Ok(report) if !report.orphaned.is_empty() => {
            warn!(
                orphaned = report.orphaned.len(),
                "Some restored tasks are pending without a queue slot"
            );
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "Task restore failed, starting with an empty registry"),
    }

    let listener = TcpListener::bind(config.server.bind_addr).await?;
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    let state = AppState::new(config, manager.clone());

    let served = api::serve(listener, state, api::shutdown_signal()).await;

    if manager.shutdown(shutdown_timeout).await == ShutdownOutcome::TimedOut {
        warn!(?shutdown_timeout, "Workers did not stop in time");
    }

    if let Some(ledger) = ledger {
        if let Err(e) = ledger.persist() {
            error!(error = %e, "Failed to flush Fjall store");
        }
    }

    served
}
