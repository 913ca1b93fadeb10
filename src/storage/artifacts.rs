use bytes::Bytes;
use object_store::{
    ObjectStore, WriteMultipart, local::LocalFileSystem, memory::InMemory,
    path::Path as StoragePath,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Parts allowed in flight before `write` waits for uploads to drain
const MAX_CONCURRENT_PARTS: usize = 2;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
}

pub type Result<T> = std::result::Result<T, ArtifactError>;

/// Where downloaded file bodies end up
#[derive(Clone)]
pub struct ArtifactStore {
    store: Arc<dyn ObjectStore>,
}

impl ArtifactStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Files written under `dir` on the local filesystem
    pub fn local<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let store = LocalFileSystem::new_with_prefix(dir)?;

        Ok(Self::new(Arc::new(store)))
    }

    /// In-memory storage for testing
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    /// Start a streamed upload to `key`
    ///
    /// Nothing is visible under `key` until [`ArtifactWriter::finish`]
    /// succeeds.
    pub async fn writer(&self, key: &str) -> Result<ArtifactWriter> {
        if key.is_empty() {
            return Err(ArtifactError::UploadFailed("empty key".to_string()));
        }

        let upload = self.store.put_multipart(&StoragePath::from(key)).await?;

        Ok(ArtifactWriter {
            key: key.to_string(),
            inner: WriteMultipart::new(upload),
            size: 0,
        })
    }

    pub async fn read(&self, key: &str) -> Result<Bytes> {
        let path = StoragePath::from(key);
        let result = self.store.get(&path).await?;
        Ok(result.bytes().await?)
    }
}

/// In-progress multipart upload of one artifact
pub struct ArtifactWriter {
    key: String,
    inner: WriteMultipart,
    size: u64,
}

impl ArtifactWriter {
    pub async fn write(&mut self, chunk: Bytes) -> Result<()> {
        self.inner.wait_for_capacity(MAX_CONCURRENT_PARTS).await?;
        self.size += chunk.len() as u64;
        self.inner.put(chunk);
        Ok(())
    }

    /// Complete the upload, returning the number of bytes written
    pub async fn finish(self) -> Result<u64> {
        self.inner.finish().await?;
        tracing::debug!(key = %self.key, size = self.size, "Stored artifact");
        Ok(self.size)
    }

    /// Drop everything written so far
    pub async fn abort(self) -> Result<()> {
        self.inner.abort().await?;
        tracing::debug!(key = %self.key, "Aborted artifact upload");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_in_memory_chunks_are_joined() {
        let store = ArtifactStore::in_memory();
        let mut writer = store.writer("report.pdf").await.unwrap();
        writer.write(Bytes::from_static(b"%P")).await.unwrap();
        writer.write(Bytes::from_static(b"DF")).await.unwrap();

        assert_eq!(writer.finish().await.unwrap(), 4);
        assert_eq!(store.read("report.pdf").await.unwrap(), Bytes::from_static(b"%PDF"));
        assert!(store.read("other.pdf").await.is_err());
    }

    #[tokio::test]
    async fn test_local_writes_into_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("downloads");
        let store = ArtifactStore::local(&dir).unwrap();

        let mut writer = store.writer("hello.txt").await.unwrap();
        writer.write(Bytes::from_static(b"hello")).await.unwrap();
        writer.finish().await.unwrap();

        assert_eq!(std::fs::read(dir.join("hello.txt")).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_empty_body_creates_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::local(temp_dir.path()).unwrap();

        let writer = store.writer("empty.bin").await.unwrap();
        assert_eq!(writer.finish().await.unwrap(), 0);
        assert!(std::fs::read(temp_dir.path().join("empty.bin")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abort_leaves_nothing_behind() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::local(temp_dir.path()).unwrap();

        let mut writer = store.writer("partial.bin").await.unwrap();
        writer.write(Bytes::from_static(b"half")).await.unwrap();
        writer.abort().await.unwrap();

        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_rejects_empty_key() {
        let store = ArtifactStore::in_memory();
        let result = store.writer("").await;
        assert!(matches!(result, Err(ArtifactError::UploadFailed(_))));
    }
}
