// Error types module

use std::fmt;

use crate::resolver::{ReferenceError, ResolveError};
use crate::watermark::WatermarkError;

/// Request-level error for the image delivery path
///
/// Upstream failures are kept apart from NotFound for logs and metrics but
/// reach the client with the same 404.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    /// Missing, conflicting or invalid query parameters
    BadRequest(String),

    /// Source absent from every location
    NotFound(String),

    /// Storage or remote fetch failed (transport error, timeout)
    Upstream(String),

    /// Decoding, compositing or encoding failed with nothing to fall back to
    Compositing(String),

    /// Render cache write failed; never surfaced to the client
    CacheWrite(String),

    /// Configuration errors (invalid YAML, missing env vars, etc.)
    Config(String),

    /// Anything else
    Internal(String),
}

impl ProxyError {
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::BadRequest(_) => 400,
            ProxyError::NotFound(_) | ProxyError::Upstream(_) => 404,
            ProxyError::Compositing(_)
            | ProxyError::CacheWrite(_)
            | ProxyError::Config(_)
            | ProxyError::Internal(_) => 500,
        }
    }

    /// Plain-text body sent to clients; internal details stay in the logs.
    pub fn client_message(&self) -> &'static str {
        match self.status_code() {
            400 => "Image path or URL is required",
            404 => "Image not found",
            _ => "Internal server error",
        }
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ProxyError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ProxyError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            ProxyError::Compositing(msg) => write!(f, "Compositing failure: {}", msg),
            ProxyError::CacheWrite(msg) => write!(f, "Cache write failure: {}", msg),
            ProxyError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ProxyError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ProxyError {}

impl From<ReferenceError> for ProxyError {
    fn from(err: ReferenceError) -> Self {
        ProxyError::BadRequest(err.to_string())
    }
}

impl From<ResolveError> for ProxyError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(msg) => ProxyError::NotFound(msg),
            ResolveError::Upstream(msg) => ProxyError::Upstream(msg),
        }
    }
}

impl From<WatermarkError> for ProxyError {
    fn from(err: WatermarkError) -> Self {
        ProxyError::Compositing(err.to_string())
    }
}
