//! Render cache configuration.

use serde::{Deserialize, Serialize};

/// Optional in-process layer in front of the cache namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryLayerConfig {
    /// Total size budget for cached renders
    pub max_size_mb: u64,
    /// Entries expire after this long; unset keeps them until evicted by size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
}

impl MemoryLayerConfig {
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RenderCacheConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryLayerConfig>,
    /// Fold a digest of the watermark settings into watermarked keys so that
    /// settings edits produce fresh renders
    #[serde(default)]
    pub key_includes_settings: bool,
}
