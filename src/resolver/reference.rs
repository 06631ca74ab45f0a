//! Logical image references and their validation.

use sha2::{Digest, Sha256};

use crate::constants::CANONICAL_EXTENSION;

/// Length of the hex digest used to identify external URLs
const URL_HASH_LEN: usize = 16;

/// Identifies a source image: a storage key or an absolute URL to proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageReference {
    Path(String),
    ExternalUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("image reference is empty")]
    Empty,

    #[error("path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ImageReference {
    /// Build a storage-key reference.
    ///
    /// Leading slashes are dropped; keys that could leave the namespace are
    /// rejected.
    pub fn path(value: &str) -> Result<Self, ReferenceError> {
        check_path_traversal(value)?;

        let key = value.trim().trim_start_matches('/');
        if key.is_empty() {
            return Err(ReferenceError::Empty);
        }
        Ok(Self::Path(key.to_string()))
    }

    /// Build an external URL reference. Only http and https are accepted.
    pub fn external_url(value: &str) -> Result<Self, ReferenceError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let parsed = reqwest::Url::parse(value).map_err(|e| ReferenceError::InvalidUrl {
            url: value.to_string(),
            reason: e.to_string(),
        })?;

        match parsed.scheme() {
            "http" | "https" => Ok(Self::ExternalUrl(value.to_string())),
            other => Err(ReferenceError::InvalidUrl {
                url: value.to_string(),
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }

    /// Parse a logo setting: URLs are fetched over HTTP, anything else is a
    /// storage key.
    pub fn parse_logo(value: &str) -> Result<Self, ReferenceError> {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::external_url(value)
        } else {
            Self::path(value)
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Path(v) | Self::ExternalUrl(v) => v,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Path(_) => "path",
            Self::ExternalUrl(_) => "url",
        }
    }

    /// Stable identity used in cache keys: the storage key verbatim, or a
    /// short hash of the URL.
    pub fn identity(&self) -> String {
        match self {
            Self::Path(key) => key.clone(),
            Self::ExternalUrl(url) => format!("{}.{}", url_hash(url), CANONICAL_EXTENSION),
        }
    }

    /// File name offered to clients in `Content-Disposition`.
    pub fn file_name(&self) -> String {
        match self {
            Self::Path(key) => key.rsplit('/').next().unwrap_or(key).to_string(),
            Self::ExternalUrl(_) => self.identity(),
        }
    }
}

/// Hex prefix of the SHA-256 of `url`.
pub fn url_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(URL_HASH_LEN);
    hex
}

/// Reject keys containing parent-directory segments or NUL bytes.
///
/// The value has already been percent-decoded once; encoded sequences that
/// survive decoding are also rejected.
fn check_path_traversal(path: &str) -> Result<(), ReferenceError> {
    let lower = path.to_lowercase();
    let traversal = path.contains('\0')
        || lower.contains("%2e%2e")
        || lower.contains("%00")
        || path.split(|c: char| c == '/' || c == '\\').any(|segment| segment == "..");

    if traversal {
        return Err(ReferenceError::PathTraversal {
            path: path.to_string(),
        });
    }
    Ok(())
}
