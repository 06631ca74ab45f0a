// Image delivery orchestrator
//
// Request flow: validate params -> render cache lookup -> on miss resolve the
// source, composite (or skip when watermarking is disabled), write the cache
// best-effort -> respond.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{CacheKey, RenderCache};
use crate::config::Config;
use crate::constants::{CANONICAL_CONTENT_TYPE, DEGRADED_CACHE_CONTROL, IMMUTABLE_CACHE_CONTROL};
use crate::error::ProxyError;
use crate::metrics::DeliveryMetrics;
use crate::resolver::{SourceImage, StorageResolver};
use crate::settings::{build_settings_store, SettingsAccessor, SettingsStore, WatermarkConfig};
use crate::storage::{build_blob_store, BlobStore};
use crate::watermark::{build_compositor, RenderOutcome, Rendition, WatermarkCompositor, WatermarkError};

pub mod query;

pub use query::ImageQuery;

/// Fully materialized response for an `/image` request.
#[derive(Debug, Clone)]
pub struct ImageResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Bytes,
    /// Render cache key, once the request got far enough to compute one
    pub cache_key: Option<CacheKey>,
    pub cache_hit: bool,
}

impl ImageResponse {
    fn image(
        query: &ImageQuery,
        key: CacheKey,
        body: Bytes,
        content_type: &str,
        cache_control: &str,
        cache_hit: bool,
    ) -> Self {
        let mut headers = vec![
            ("Content-Type", content_type.to_string()),
            ("Cache-Control", cache_control.to_string()),
            ("X-Cache", if cache_hit { "HIT" } else { "MISS" }.to_string()),
        ];
        if query.watermark {
            headers.push((
                "Content-Disposition",
                attachment_disposition(&query.reference.file_name()),
            ));
        }

        Self {
            status: 200,
            headers,
            body,
            cache_key: Some(key),
            cache_hit,
        }
    }

    /// Plain-text error response; details stay in the logs.
    pub fn from_error(err: &ProxyError) -> Self {
        Self {
            status: err.status_code(),
            headers: vec![("Content-Type", "text/plain; charset=utf-8".to_string())],
            body: Bytes::from_static(err.client_message().as_bytes()),
            cache_key: None,
            cache_hit: false,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// `attachment; filename="..."`, with an RFC 5987 `filename*` when the name
/// is not plain ASCII.
pub fn attachment_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if file_name.is_ascii() {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(file_name)
        )
    }
}

pub struct ImageService {
    cache: RenderCache,
    resolver: Arc<StorageResolver>,
    settings: SettingsAccessor,
    compositor: WatermarkCompositor,
    key_includes_settings: bool,
}

impl ImageService {
    /// Build the service with the backends named in `config`.
    pub fn from_config(config: &Config) -> Result<Self, ProxyError> {
        let store = build_blob_store(&config.storage).map_err(ProxyError::Config)?;
        let settings = build_settings_store(&config.settings).map_err(ProxyError::Config)?;
        Self::with_backends(config, store, settings)
    }

    /// Build the service around already constructed stores.
    pub fn with_backends(
        config: &Config,
        store: Arc<dyn BlobStore>,
        settings_store: Arc<dyn SettingsStore>,
    ) -> Result<Self, ProxyError> {
        let resolver = Arc::new(
            StorageResolver::new(
                store.clone(),
                &config.storage.namespaces,
                config.render.fetch_timeout(),
            )
            .map_err(ProxyError::Config)?,
        );
        let compositor = build_compositor(&config.render, resolver.clone())
            .map_err(|e| ProxyError::Config(e.to_string()))?;

        Ok(Self {
            cache: RenderCache::new(store, config.storage.namespaces.cache.clone(), &config.cache),
            resolver,
            settings: SettingsAccessor::new(settings_store, config.settings.site_name.clone()),
            compositor,
            key_includes_settings: config.cache.key_includes_settings,
        })
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// Answer an `/image` request from its raw query string. Never fails:
    /// errors become plain-text responses.
    pub async fn handle(&self, raw_query: Option<&str>) -> ImageResponse {
        let start = Instant::now();

        let result = match ImageQuery::from_query_string(raw_query) {
            Ok(query) => self.deliver(&query).await,
            Err(e) => Err(e),
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    ProxyError::BadRequest(_) | ProxyError::NotFound(_) => {
                        tracing::debug!(error = %e, "Image request rejected")
                    }
                    ProxyError::Upstream(_) => {
                        tracing::warn!(error = %e, "Image source unavailable")
                    }
                    _ => tracing::error!(error = %e, "Image request failed"),
                }
                ImageResponse::from_error(&e)
            }
        };

        DeliveryMetrics::global().record_response(response.status);
        tracing::info!(
            status = response.status,
            cache_key = response.cache_key.as_ref().map(CacheKey::as_str).unwrap_or("-"),
            cache_hit = response.cache_hit,
            duration_ms = start.elapsed().as_millis() as u64,
            "Served image request"
        );
        response
    }

    /// Serve a validated request.
    pub async fn deliver(&self, query: &ImageQuery) -> Result<ImageResponse, ProxyError> {
        let metrics = DeliveryMetrics::global();

        // Settings are only needed up front when they are part of the key
        let prefetched = if query.watermark && self.key_includes_settings {
            Some(self.settings.current_watermark_config().await)
        } else {
            None
        };
        let fingerprint = prefetched.as_ref().map(settings_fingerprint);
        let key = CacheKey::for_request(&query.reference, query.watermark, fingerprint.as_deref());

        match self.cache.get(&key).await {
            Ok(Some(bytes)) => {
                metrics.record_cache_lookup(true);
                tracing::debug!(cache_key = %key, "Render cache hit");
                return Ok(ImageResponse::image(
                    query,
                    key,
                    bytes,
                    CANONICAL_CONTENT_TYPE,
                    IMMUTABLE_CACHE_CONTROL,
                    true,
                ));
            }
            Ok(None) => {
                metrics.record_cache_lookup(false);
                tracing::debug!(cache_key = %key, "Render cache miss");
            }
            Err(e) => {
                metrics.record_cache_lookup(false);
                tracing::warn!(cache_key = %key, error = %e, "Render cache lookup failed, rendering anyway");
            }
        }

        let source = self.resolver.resolve(&query.reference).await.map_err(|e| {
            metrics.record_source_failure(e.kind());
            ProxyError::from(e)
        })?;

        if !source.is_image() {
            tracing::warn!(
                reference = %query.reference.value(),
                content_type = %source.content_type,
                "Source is not an image, serving unmodified"
            );
            return Ok(ImageResponse::image(
                query,
                key,
                source.bytes,
                &source.content_type,
                DEGRADED_CACHE_CONTROL,
                false,
            ));
        }

        // Settings are resolved before the render timer starts
        let watermark = if query.watermark {
            Some(match prefetched {
                Some(config) => config,
                None => self.settings.current_watermark_config().await,
            })
        } else {
            None
        };

        let name_hint = query.reference.file_name();
        let timer = metrics.render_duration.start_timer();
        let rendered = match watermark {
            Some(config) if config.enabled => {
                self.compositor
                    .apply(source.bytes.clone(), &source.content_type, &name_hint, &config)
                    .await
            }
            Some(_) => {
                tracing::debug!(cache_key = %key, "Watermark disabled in settings, rendering clean");
                self.compositor
                    .render_clean(source.bytes.clone(), &name_hint, RenderOutcome::Clean)
                    .await
            }
            None => {
                self.compositor
                    .render_clean(source.bytes.clone(), &name_hint, RenderOutcome::Clean)
                    .await
            }
        };
        timer.observe_duration();

        let rendition = match rendered {
            Ok(rendition) => rendition,
            Err(e) => self.recover(query, &source, &name_hint, e).await?,
        };
        metrics.record_render(rendition.outcome.as_str());

        if rendition.is_degraded() {
            metrics.degraded_renders.inc();
            tracing::warn!(cache_key = %key, "Serving degraded rendition, not caching");
            return Ok(ImageResponse::image(
                query,
                key,
                rendition.bytes,
                &rendition.content_type,
                DEGRADED_CACHE_CONTROL,
                false,
            ));
        }

        if let Err(e) = self.cache.put(&key, rendition.bytes.clone()).await {
            metrics.cache_write_failures.inc();
            let err = ProxyError::CacheWrite(e.to_string());
            tracing::warn!(cache_key = %key, error = %err, "Render cache write failed");
        }

        Ok(ImageResponse::image(
            query,
            key,
            rendition.bytes,
            &rendition.content_type,
            IMMUTABLE_CACHE_CONTROL,
            false,
        ))
    }

    /// Fallback after a failed render: a clean re-encode when the watermark
    /// step was what failed, otherwise the source bytes as stored.
    async fn recover(
        &self,
        query: &ImageQuery,
        source: &SourceImage,
        name_hint: &str,
        error: WatermarkError,
    ) -> Result<Rendition, ProxyError> {
        tracing::warn!(
            reference = %query.reference.value(),
            error = %error,
            "Render failed, falling back to unwatermarked output"
        );

        if source.bytes.is_empty() {
            return Err(ProxyError::from(error));
        }

        if query.watermark && !matches!(error, WatermarkError::DecodeError(_)) {
            match self
                .compositor
                .render_clean(source.bytes.clone(), name_hint, RenderOutcome::Degraded)
                .await
            {
                Ok(rendition) => return Ok(rendition),
                Err(e) => tracing::warn!(error = %e, "Clean re-encode failed, serving source bytes"),
            }
        }

        Ok(Rendition {
            bytes: source.bytes.clone(),
            content_type: source.content_type.clone(),
            outcome: RenderOutcome::Degraded,
        })
    }
}

/// Key component for the effective settings. Disabled watermarking renders
/// clean output, so it gets its own marker.
fn settings_fingerprint(config: &WatermarkConfig) -> String {
    if config.enabled {
        config.fingerprint()
    } else {
        "off".to_string()
    }
}
