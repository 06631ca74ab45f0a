//! Source image resolution.
//!
//! Storage keys are looked up in the primary namespace and then in the
//! legacy namespace that older catalog entries still live in. External URLs
//! are fetched with a single GET bounded by the fetch timeout. Nothing here
//! retries; a failed lookup is terminal for the request.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use crate::config::NamespacesConfig;
use crate::metrics::DeliveryMetrics;
use crate::storage::{content_type_for_key, BlobStore};

pub mod reference;

pub use reference::{ImageReference, ReferenceError};

/// Content type assumed when neither the store nor the key tells us.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type assumed for external sources that do not send one.
const EXTERNAL_DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Where a resolved source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrigin {
    Primary,
    Legacy,
    External,
}

#[derive(Debug, Clone)]
pub struct SourceImage {
    pub bytes: Bytes,
    pub content_type: String,
    pub origin: SourceOrigin,
}

impl SourceImage {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Absent from every location in the chain
    #[error("source not found: {0}")]
    NotFound(String),

    /// Transport failure or timeout talking to a store or remote host
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl ResolveError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Upstream(_) => "upstream",
        }
    }
}

pub struct StorageResolver {
    store: Arc<dyn BlobStore>,
    primary: String,
    legacy: String,
    http: reqwest::Client,
}

impl StorageResolver {
    pub fn new(
        store: Arc<dyn BlobStore>,
        namespaces: &NamespacesConfig,
        fetch_timeout: Duration,
    ) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {}", e))?;

        Ok(Self {
            store,
            primary: namespaces.primary.clone(),
            legacy: namespaces.legacy.clone(),
            http,
        })
    }

    pub async fn resolve(&self, reference: &ImageReference) -> Result<SourceImage, ResolveError> {
        match reference {
            ImageReference::Path(key) => self.resolve_key(key).await,
            ImageReference::ExternalUrl(url) => self.fetch_url(url).await,
        }
    }

    async fn resolve_key(&self, key: &str) -> Result<SourceImage, ResolveError> {
        let chain = [
            (self.primary.as_str(), SourceOrigin::Primary),
            (self.legacy.as_str(), SourceOrigin::Legacy),
        ];
        let mut last_error = None;

        for (namespace, origin) in chain {
            match self.store.download(namespace, key).await {
                Ok(Some(blob)) => {
                    if origin == SourceOrigin::Legacy {
                        DeliveryMetrics::global().legacy_fallbacks.inc();
                        tracing::debug!(key = %key, namespace = %namespace, "Source found in legacy namespace");
                    }
                    let content_type = blob
                        .content_type
                        .filter(|ct| !ct.is_empty())
                        .or_else(|| content_type_for_key(key).map(str::to_string))
                        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());
                    return Ok(SourceImage {
                        bytes: blob.bytes,
                        content_type,
                        origin,
                    });
                }
                Ok(None) => {
                    tracing::debug!(key = %key, namespace = %namespace, "Source missing from namespace");
                }
                Err(e) => {
                    // Keep walking the chain; the legacy copy may still be reachable
                    tracing::warn!(
                        key = %key,
                        namespace = %namespace,
                        backend = self.store.backend_name(),
                        error = %e,
                        "Storage lookup failed"
                    );
                    last_error = Some(e.to_string());
                }
            }
        }

        match last_error {
            Some(e) => Err(ResolveError::Upstream(e)),
            None => Err(ResolveError::NotFound(key.to_string())),
        }
    }

    async fn fetch_url(&self, url: &str) -> Result<SourceImage, ResolveError> {
        let response = self.http.get(url).send().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "External fetch failed");
            ResolveError::Upstream(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = status.as_u16(), "External source returned non-success status");
            return Err(ResolveError::NotFound(format!("{} returned {}", url, status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| EXTERNAL_DEFAULT_CONTENT_TYPE.to_string());

        let bytes = response.bytes().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Failed to read external response body");
            ResolveError::Upstream(e.to_string())
        })?;

        Ok(SourceImage {
            bytes,
            content_type,
            origin: SourceOrigin::External,
        })
    }
}
