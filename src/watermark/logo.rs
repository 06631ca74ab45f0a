//! Logo asset fetching with an in-memory memo.
//!
//! Logo references are resolved the same way as source images: storage keys
//! go through the primary/legacy chain, `http(s)` URLs are fetched once with
//! the fetch timeout. Decoded logos are kept in a `moka` cache keyed by the
//! reference string until their TTL expires. Settings values themselves are
//! never cached here.

use super::codec::decode_image;
use super::WatermarkError;
use crate::resolver::{ImageReference, StorageResolver};
use image::DynamicImage;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LogoFetcherConfig {
    pub max_cache_entries: u64,
    pub cache_ttl: Duration,
}

impl Default for LogoFetcherConfig {
    fn default() -> Self {
        Self {
            max_cache_entries: 16,
            cache_ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Clone)]
pub struct LogoFetcher {
    cache: Cache<String, Arc<DynamicImage>>,
    resolver: Arc<StorageResolver>,
}

impl LogoFetcher {
    pub fn new(resolver: Arc<StorageResolver>, config: LogoFetcherConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_cache_entries)
            .time_to_live(config.cache_ttl)
            .build();

        Self { cache, resolver }
    }

    /// Fetch and decode the logo, serving repeated requests from memory.
    pub async fn fetch(&self, logo: &str) -> Result<Arc<DynamicImage>, WatermarkError> {
        if let Some(cached) = self.cache.get(logo).await {
            return Ok(cached);
        }

        let reference = ImageReference::parse_logo(logo)
            .map_err(|e| WatermarkError::FetchError(e.to_string()))?;

        let source = self
            .resolver
            .resolve(&reference)
            .await
            .map_err(|e| WatermarkError::FetchError(e.to_string()))?;

        let decoded = decode_image(&source.bytes, reference.value())
            .map_err(|e| WatermarkError::FetchError(format!("logo is not an image: {}", e)))?;
        let decoded = Arc::new(decoded);

        tracing::debug!(
            logo = %logo,
            width = decoded.width(),
            height = decoded.height(),
            "Loaded watermark logo"
        );

        self.cache.insert(logo.to_string(), decoded.clone()).await;
        Ok(decoded)
    }

    pub fn cache_size(&self) -> u64 {
        self.cache.entry_count()
    }

    pub async fn is_cached(&self, logo: &str) -> bool {
        self.cache.get(logo).await.is_some()
    }
}
