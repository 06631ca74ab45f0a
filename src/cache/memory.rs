//! In-process render cache layer backed by moka

use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::config::MemoryLayerConfig;
use super::key::CacheKey;

/// Statistics tracker using atomics for thread safety
#[derive(Default)]
pub(crate) struct CacheStatsTracker {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStatsTracker {
    pub fn increment_hits(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_misses(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_evictions(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time view of the memory layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayerStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entry_count: u64,
    pub weighted_size_bytes: u64,
}

/// Size-bounded, optionally expiring map from cache key to rendered bytes
pub struct MemoryLayer {
    cache: moka::future::Cache<CacheKey, Bytes>,
    stats: Arc<CacheStatsTracker>,
    max_size_bytes: u64,
}

impl MemoryLayer {
    pub fn new(config: &MemoryLayerConfig) -> Self {
        let stats = Arc::new(CacheStatsTracker::default());
        let stats_clone = stats.clone();

        let mut builder = moka::future::Cache::builder()
            .max_capacity(config.max_size_bytes())
            .weigher(|_key, value: &Bytes| value.len().try_into().unwrap_or(u32::MAX))
            .eviction_listener(move |_key, _value, cause| {
                use moka::notification::RemovalCause;
                if matches!(cause, RemovalCause::Size | RemovalCause::Expired) {
                    stats_clone.increment_evictions();
                }
            });

        if let Some(ttl) = config.ttl_seconds {
            builder = builder.time_to_live(Duration::from_secs(ttl));
        }

        Self {
            cache: builder.build(),
            stats,
            max_size_bytes: config.max_size_bytes(),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Bytes> {
        match self.cache.get(key).await {
            Some(bytes) => {
                self.stats.increment_hits();
                Some(bytes)
            }
            None => {
                self.stats.increment_misses();
                None
            }
        }
    }

    /// Entries larger than the whole budget are not admitted.
    pub async fn insert(&self, key: CacheKey, bytes: Bytes) {
        if bytes.len() as u64 > self.max_size_bytes {
            return;
        }
        self.cache.insert(key, bytes).await;
    }

    pub async fn stats(&self) -> MemoryLayerStats {
        self.cache.run_pending_tasks().await;
        MemoryLayerStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            entry_count: self.cache.entry_count(),
            weighted_size_bytes: self.cache.weighted_size(),
        }
    }
}
