use axum::{
    Router,
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Redirect},
    routing::get,
};
use bytes::Bytes;
use futures_util::stream;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

use batchfetch::config::ManagerConfig;
use batchfetch::downloader::{DownloadError, Downloader, HttpConfig, HttpDownloader};
use batchfetch::manager::TaskManager;
use batchfetch::storage::{ArtifactStore, FileStore, TaskStore};
use batchfetch::tasks::{DownloadTask, TaskStatus};

const REPORT: &str = "quarterly numbers\n";
const CHUNK_SIZE: usize = 1024 * 1024;
const CHUNK_COUNT: usize = 12;

/// Start embedded HTTP server serving test fixtures
async fn start_mock_server() -> String {
    let app = Router::new()
        .route("/files/report.txt", get(|| async { REPORT }))
        .route("/attachment", get(serve_attachment))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route("/moved", get(|| async { Redirect::temporary("/files/report.txt") }))
        .route("/", get(|| async { "index" }))
        .route("/slow", get(serve_slow))
        .route("/chunked/archive.bin", get(serve_chunked))
        .route("/broken/archive.bin", get(serve_broken));

    // Bind to random available port
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let bound_addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", bound_addr)
}

async fn serve_attachment() -> impl IntoResponse {
    (
        [(header::CONTENT_DISPOSITION, r#"attachment; filename="export.csv""#)],
        "id,value\n1,2\n",
    )
}

async fn serve_slow() -> &'static str {
    sleep(Duration::from_secs(2)).await;
    "late"
}

/// Body without Content-Length, sent as many chunks
async fn serve_chunked() -> Body {
    let chunks = (0..CHUNK_COUNT)
        .map(|i| Ok::<_, std::io::Error>(Bytes::from(vec![i as u8; CHUNK_SIZE])));
    Body::from_stream(stream::iter(chunks))
}

/// Body that fails after the first chunk
async fn serve_broken() -> Body {
    let chunks = vec![
        Ok(Bytes::from_static(b"partial")),
        Err(std::io::Error::other("connection reset")),
    ];
    Body::from_stream(stream::iter(chunks))
}

fn downloader(artifacts: ArtifactStore) -> HttpDownloader {
    HttpDownloader::new(HttpConfig::default(), artifacts).unwrap()
}

#[tokio::test]
async fn test_download_writes_file() {
    let base = start_mock_server().await;
    let temp_dir = TempDir::new().unwrap();
    let artifacts = ArtifactStore::local(temp_dir.path()).unwrap();
    let client = downloader(artifacts);

    let url = format!("{base}/files/report.txt");
    let result = client.fetch(&url).await.unwrap();

    assert_eq!(result.url, url);
    assert_eq!(result.file_name.as_deref(), Some("report.txt"));
    assert_eq!(result.size, Some(REPORT.len() as u64));
    assert!(result.error.is_none());

    let written = std::fs::read_to_string(temp_dir.path().join("report.txt")).unwrap();
    assert_eq!(written, REPORT);
}

#[tokio::test]
async fn test_chunked_body_is_streamed_to_disk() {
    let base = start_mock_server().await;
    let temp_dir = TempDir::new().unwrap();
    let client = downloader(ArtifactStore::local(temp_dir.path()).unwrap());

    let result = client
        .fetch(&format!("{base}/chunked/archive.bin"))
        .await
        .unwrap();

    let expected_size = (CHUNK_SIZE * CHUNK_COUNT) as u64;
    assert_eq!(result.file_name.as_deref(), Some("archive.bin"));
    assert_eq!(result.size, Some(expected_size));

    let written = std::fs::read(temp_dir.path().join("archive.bin")).unwrap();
    assert_eq!(written.len() as u64, expected_size);
    for (i, chunk) in written.chunks(CHUNK_SIZE).enumerate() {
        assert!(chunk.iter().all(|b| *b == i as u8), "chunk {i} out of order");
    }
}

#[tokio::test]
async fn test_broken_body_leaves_no_file() {
    let base = start_mock_server().await;
    let temp_dir = TempDir::new().unwrap();
    let client = downloader(ArtifactStore::local(temp_dir.path()).unwrap());

    let err = client
        .fetch(&format!("{base}/broken/archive.bin"))
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::RequestFailed(_)));
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_content_disposition_name_wins() {
    let base = start_mock_server().await;
    let artifacts = ArtifactStore::in_memory();
    let client = downloader(artifacts.clone());

    let result = client.fetch(&format!("{base}/attachment")).await.unwrap();

    assert_eq!(result.file_name.as_deref(), Some("export.csv"));
    let stored = artifacts.read("export.csv").await.unwrap();
    assert_eq!(&stored[..], b"id,value\n1,2\n");
}

#[tokio::test]
async fn test_redirect_uses_final_url_name() {
    let base = start_mock_server().await;
    let client = downloader(ArtifactStore::in_memory());

    let result = client.fetch(&format!("{base}/moved")).await.unwrap();
    assert_eq!(result.file_name.as_deref(), Some("report.txt"));
}

#[tokio::test]
async fn test_fallback_name_without_path() {
    let base = start_mock_server().await;
    let client = downloader(ArtifactStore::in_memory());

    let result = client.fetch(&format!("{base}/")).await.unwrap();
    assert!(
        result
            .file_name
            .as_deref()
            .unwrap()
            .starts_with("downloaded_file_")
    );
}

#[tokio::test]
async fn test_non_200_is_an_error() {
    let base = start_mock_server().await;
    let client = downloader(ArtifactStore::in_memory());

    let err = client.fetch(&format!("{base}/missing")).await.unwrap_err();
    assert!(matches!(err, DownloadError::HttpStatus { code: 404, .. }));
    assert_eq!(err.to_string(), "HTTP status 404: Not Found");
}

#[tokio::test]
async fn test_request_timeout() {
    let base = start_mock_server().await;
    let config = HttpConfig {
        request_timeout: Duration::from_millis(200),
        ..HttpConfig::default()
    };
    let client = HttpDownloader::new(config, ArtifactStore::in_memory()).unwrap();

    let err = client.fetch(&format!("{base}/slow")).await.unwrap_err();
    assert!(matches!(err, DownloadError::Timeout));
}

#[tokio::test]
async fn test_connection_refused() {
    // bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = downloader(ArtifactStore::in_memory());
    let err = client
        .fetch(&format!("http://{addr}/file.txt"))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::RequestFailed(_)));
}

#[tokio::test]
async fn test_task_over_real_http() {
    let base = start_mock_server().await;
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::open(temp_dir.path().join("tasks")).unwrap());
    let artifacts = ArtifactStore::local(temp_dir.path().join("downloads")).unwrap();

    let manager = TaskManager::new(
        &ManagerConfig {
            workers: 2,
            queue_capacity: 10,
        },
        store.clone(),
        Arc::new(downloader(artifacts)),
    );

    let urls = vec![
        format!("{base}/files/report.txt"),
        format!("{base}/missing"),
        format!("{base}/attachment"),
    ];
    let created = manager.create_task(urls.clone()).await.unwrap();

    let mut task = created.clone();
    for _ in 0..500 {
        task = manager.get_task(&created.id).await.unwrap();
        if task.is_finished() {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.results.len(), 3);
    assert_eq!(task.results[0].file_name.as_deref(), Some("report.txt"));
    assert!(task.results[1].is_error());
    assert_eq!(task.results[2].file_name.as_deref(), Some("export.csv"));

    let persisted: DownloadTask = store.load(&created.id).await.unwrap();
    assert_eq!(persisted, task);
    assert!(temp_dir.path().join("downloads/export.csv").exists());
    assert!(
        temp_dir
            .path()
            .join("tasks")
            .join(format!("task_{}.json", created.id))
            .exists()
    );
}
