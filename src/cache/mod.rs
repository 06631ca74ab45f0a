// Render cache module
//
// Rendered images are stored in a dedicated namespace of the blob store and
// live there indefinitely. An optional in-process layer answers repeated
// requests without a storage round trip. There is no locking: concurrent
// renders of the same key each write, and the last write wins.

use bytes::Bytes;
use std::sync::Arc;

use crate::constants::CANONICAL_CONTENT_TYPE;
use crate::storage::BlobStore;

pub mod config;
pub mod error;
pub mod key;
pub mod memory;

pub use config::{MemoryLayerConfig, RenderCacheConfig};
pub use error::CacheError;
pub use key::CacheKey;
pub use memory::{MemoryLayer, MemoryLayerStats};

pub struct RenderCache {
    store: Arc<dyn BlobStore>,
    namespace: String,
    memory: Option<MemoryLayer>,
}

impl RenderCache {
    pub fn new(
        store: Arc<dyn BlobStore>,
        namespace: impl Into<String>,
        config: &RenderCacheConfig,
    ) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            memory: config.memory.as_ref().map(MemoryLayer::new),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Look up a rendition. `Ok(None)` is a miss.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        if let Some(memory) = &self.memory {
            if let Some(bytes) = memory.get(key).await {
                return Ok(Some(bytes));
            }
        }

        let blob = self.store.download(&self.namespace, key.as_str()).await?;
        let Some(blob) = blob else {
            return Ok(None);
        };

        if let Some(memory) = &self.memory {
            memory.insert(key.clone(), blob.bytes.clone()).await;
        }
        Ok(Some(blob.bytes))
    }

    /// Store a rendition in the canonical format.
    pub async fn put(&self, key: &CacheKey, bytes: Bytes) -> Result<(), CacheError> {
        self.store
            .upload(
                &self.namespace,
                key.as_str(),
                bytes.clone(),
                CANONICAL_CONTENT_TYPE,
            )
            .await?;

        if let Some(memory) = &self.memory {
            memory.insert(key.clone(), bytes).await;
        }
        Ok(())
    }

    pub async fn memory_stats(&self) -> Option<MemoryLayerStats> {
        match &self.memory {
            Some(memory) => Some(memory.stats().await),
            None => None,
        }
    }
}
