//! Render configuration: output encoding, font and logo fetching.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_JPEG_QUALITY, DEFAULT_LOGO_CACHE_MAX_ENTRIES,
    DEFAULT_LOGO_CACHE_TTL_SECS,
};

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_logo_cache_ttl() -> u64 {
    DEFAULT_LOGO_CACHE_TTL_SECS
}

fn default_logo_cache_max_entries() -> u64 {
    DEFAULT_LOGO_CACHE_MAX_ENTRIES
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// JPEG quality for every rendered output (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// TrueType font for text watermarks; common system locations and then
    /// the bundled font are used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
    /// Timeout for external source and logo fetches
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
    #[serde(default = "default_logo_cache_ttl")]
    pub logo_cache_ttl_seconds: u64,
    #[serde(default = "default_logo_cache_max_entries")]
    pub logo_cache_max_entries: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
            font_path: None,
            fetch_timeout_seconds: default_fetch_timeout(),
            logo_cache_ttl_seconds: default_logo_cache_ttl(),
            logo_cache_max_entries: default_logo_cache_max_entries(),
        }
    }
}

impl RenderConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}
