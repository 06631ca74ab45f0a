// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.
// Using constants instead of magic numbers keeps the defaults in one place.

// =============================================================================
// Server defaults
// =============================================================================

/// Default maximum concurrent requests
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 1000;

/// Default number of worker threads
pub const DEFAULT_THREADS: usize = 4;

// =============================================================================
// Storage defaults
// =============================================================================

/// Namespace holding uploaded originals
pub const DEFAULT_PRIMARY_NAMESPACE: &str = "original";

/// Historical namespace kept for older catalog entries
pub const DEFAULT_LEGACY_NAMESPACE: &str = "products";

/// Namespace holding rendered (clean or watermarked) outputs
pub const DEFAULT_CACHE_NAMESPACE: &str = "watermarked";

/// Default timeout for a single storage call in seconds
pub const DEFAULT_STORAGE_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// Settings store defaults
// =============================================================================

/// Default timeout for a settings store read in seconds
pub const DEFAULT_SETTINGS_TIMEOUT_SECS: u64 = 5;

/// Default settings table name (PostgREST layout)
pub const DEFAULT_SETTINGS_TABLE: &str = "site_settings";

/// Fallback watermark text when no site name is configured
pub const DEFAULT_SITE_NAME: &str = "SINOTRUK Hà Nội";

/// Default watermark opacity in percent
pub const DEFAULT_WATERMARK_OPACITY_PERCENT: u8 = 40;

/// Lowest accepted watermark opacity in percent
pub const MIN_WATERMARK_OPACITY_PERCENT: u8 = 10;

/// Highest accepted watermark opacity in percent
pub const MAX_WATERMARK_OPACITY_PERCENT: u8 = 100;

// =============================================================================
// Render defaults
// =============================================================================

/// Quality used when re-encoding to the canonical output format
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Default timeout for external URL and logo fetches in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;

/// Default TTL for decoded logo assets in seconds
pub const DEFAULT_LOGO_CACHE_TTL_SECS: u64 = 300;

/// Default number of decoded logo assets kept in memory
pub const DEFAULT_LOGO_CACHE_MAX_ENTRIES: u64 = 16;

/// Content type of every rendered response
pub const CANONICAL_CONTENT_TYPE: &str = "image/jpeg";

/// File extension matching the canonical output format
pub const CANONICAL_EXTENSION: &str = "jpg";

// =============================================================================
// Response defaults
// =============================================================================

/// Cache-Control sent with every rendered image
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Retry-After seconds suggested when the concurrency limit is reached
pub const RETRY_AFTER_SECS: u64 = 5;

/// Cache-Control for renditions that were served without the intended
/// watermark and are not written to the render cache
pub const DEGRADED_CACHE_CONTROL: &str = "no-cache";
