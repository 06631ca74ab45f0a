//! Render cache keys.

use std::fmt;

use crate::resolver::ImageReference;

pub const WATERMARK_PREFIX: &str = "wm_";
pub const CLEAN_PREFIX: &str = "clean_";

/// Deterministic key for one rendition: mode prefix plus reference identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// `wm_<identity>` or `clean_<identity>`.
    ///
    /// When `settings_fingerprint` is given it is inserted into watermarked
    /// keys as `wm_<fingerprint>_<identity>`; clean keys ignore it.
    pub fn for_request(
        reference: &ImageReference,
        watermark: bool,
        settings_fingerprint: Option<&str>,
    ) -> Self {
        let identity = reference.identity();
        match (watermark, settings_fingerprint) {
            (true, Some(fp)) => Self(format!("{}{}_{}", WATERMARK_PREFIX, fp, identity)),
            (true, None) => Self(format!("{}{}", WATERMARK_PREFIX, identity)),
            (false, _) => Self(format!("{}{}", CLEAN_PREFIX, identity)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_watermarked(&self) -> bool {
        self.0.starts_with(WATERMARK_PREFIX)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
