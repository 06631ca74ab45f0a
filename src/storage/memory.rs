//! In-process blob store.
//!
//! Used for local development and as a test double: it counts downloads per
//! namespace and can be told to fail uploads or whole namespaces.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Blob, BlobStore, StorageError};

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<(String, String), Blob>>,
    downloads: RwLock<HashMap<String, u64>>,
    unavailable: RwLock<HashSet<String>>,
    fail_uploads: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object.
    pub fn insert(&self, namespace: &str, key: &str, bytes: Bytes, content_type: &str) {
        self.objects.write().insert(
            (namespace.to_string(), key.to_string()),
            Blob::new(bytes, Some(content_type.to_string())),
        );
    }

    /// Read an object without counting it as a download.
    pub fn peek(&self, namespace: &str, key: &str) -> Option<Blob> {
        self.objects
            .read()
            .get(&(namespace.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of `download` calls made against a namespace.
    pub fn download_count(&self, namespace: &str) -> u64 {
        self.downloads.read().get(namespace).copied().unwrap_or(0)
    }

    /// Make every call against `namespace` fail with a transport error.
    pub fn set_namespace_unavailable(&self, namespace: &str, unavailable: bool) {
        let mut set = self.unavailable.write();
        if unavailable {
            set.insert(namespace.to_string());
        } else {
            set.remove(namespace);
        }
    }

    /// Make every upload fail with a transport error.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    fn check_available(&self, namespace: &str) -> Result<(), StorageError> {
        if self.unavailable.read().contains(namespace) {
            return Err(StorageError::Transport(format!(
                "namespace '{}' is unavailable",
                namespace
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn download(&self, namespace: &str, key: &str) -> Result<Option<Blob>, StorageError> {
        *self
            .downloads
            .write()
            .entry(namespace.to_string())
            .or_insert(0) += 1;
        self.check_available(namespace)?;
        Ok(self.peek(namespace, key))
    }

    async fn upload(
        &self,
        namespace: &str,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.check_available(namespace)?;
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Transport("upload rejected".to_string()));
        }
        self.insert(namespace, key, bytes, content_type);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
