//! Blob storage backends.
//!
//! The proxy talks to a bucket-style blob store through the [`BlobStore`]
//! trait. Three namespaces are used: primary originals, legacy originals and
//! the render cache. Every call goes through [`TimeoutBlobStore`] so a slow
//! backend surfaces as [`StorageError::Timeout`] instead of hanging the
//! request.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{StorageBackendKind, StorageConfig};

pub mod filesystem;
pub mod memory;
pub mod s3;

pub use filesystem::FilesystemBlobStore;
pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

/// Object bytes plus the content type recorded by the store, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl Blob {
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),

    #[error("storage transport error: {0}")]
    Transport(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bucket-style blob store.
///
/// `download` returns `Ok(None)` for a missing object; errors are reserved
/// for transport failures.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn download(&self, namespace: &str, key: &str) -> Result<Option<Blob>, StorageError>;

    async fn upload(
        &self,
        namespace: &str,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Applies a per-call deadline to another store.
pub struct TimeoutBlobStore {
    inner: Arc<dyn BlobStore>,
    timeout: Duration,
}

impl TimeoutBlobStore {
    pub fn new(inner: Arc<dyn BlobStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl BlobStore for TimeoutBlobStore {
    async fn download(&self, namespace: &str, key: &str) -> Result<Option<Blob>, StorageError> {
        tokio::time::timeout(self.timeout, self.inner.download(namespace, key))
            .await
            .map_err(|_| StorageError::Timeout(self.timeout))?
    }

    async fn upload(
        &self,
        namespace: &str,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        tokio::time::timeout(
            self.timeout,
            self.inner.upload(namespace, key, bytes, content_type),
        )
        .await
        .map_err(|_| StorageError::Timeout(self.timeout))?
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

/// Build the configured blob store, wrapped with the configured timeout.
pub fn build_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, String> {
    let inner: Arc<dyn BlobStore> = match config.backend {
        StorageBackendKind::S3 => {
            let s3 = config
                .s3
                .as_ref()
                .ok_or_else(|| "storage.s3 section is missing".to_string())?;
            Arc::new(S3BlobStore::new(s3))
        }
        StorageBackendKind::Filesystem => {
            let fs = config
                .filesystem
                .as_ref()
                .ok_or_else(|| "storage.filesystem section is missing".to_string())?;
            Arc::new(FilesystemBlobStore::new(fs.root.clone()))
        }
        StorageBackendKind::Memory => Arc::new(MemoryBlobStore::new()),
    };

    Ok(Arc::new(TimeoutBlobStore::new(
        inner,
        Duration::from_secs(config.timeout_seconds),
    )))
}

/// Guess a content type from a key's extension.
pub fn content_type_for_key(key: &str) -> Option<&'static str> {
    let ext = key.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}
