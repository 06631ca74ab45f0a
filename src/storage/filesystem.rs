//! Local directory blob store: `<root>/<namespace>/<key>`.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use super::{content_type_for_key, Blob, BlobStore, StorageError};

pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Map a namespace/key pair to a path under the root.
    ///
    /// Returns `None` if either part would leave its directory.
    fn object_path(&self, namespace: &str, key: &str) -> Option<PathBuf> {
        let is_contained = |part: &str| {
            !part.is_empty()
                && Path::new(part)
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)))
        };
        if !is_contained(namespace) || !is_contained(key) {
            return None;
        }
        Some(self.root.join(namespace).join(key))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn download(&self, namespace: &str, key: &str) -> Result<Option<Blob>, StorageError> {
        let Some(path) = self.object_path(namespace, key) else {
            return Ok(None);
        };

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Blob::new(
                data,
                content_type_for_key(key).map(str::to_string),
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn upload(
        &self,
        namespace: &str,
        key: &str,
        bytes: Bytes,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.object_path(namespace, key).ok_or_else(|| {
            StorageError::Transport(format!("invalid object key '{}/{}'", namespace, key))
        })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write then rename so readers never observe a partial file
        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StorageError::Io(e));
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
