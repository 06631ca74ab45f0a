// Image delivery Prometheus metrics
//
// Counters for the request path:
// - Responses by status code
// - Render cache hits and misses
// - Renders by watermark mode, degraded renders
// - Source resolution outcomes and legacy namespace fallbacks
// - Cache write failures

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Global metrics registry for the delivery path
pub struct DeliveryMetrics {
    /// Responses by HTTP status code
    pub responses: IntCounterVec,

    /// Render cache lookups by result (hit, miss)
    pub cache_lookups: IntCounterVec,

    /// Completed renders by mode (clean, text, logo)
    pub renders: IntCounterVec,

    /// Renders that fell back to un-watermarked output
    pub degraded_renders: IntCounter,

    /// Failed render cache writes
    pub cache_write_failures: IntCounter,

    /// Source lookups satisfied by the legacy namespace
    pub legacy_fallbacks: IntCounter,

    /// Source resolution failures by kind (not_found, upstream)
    pub source_failures: IntCounterVec,

    /// Time spent decoding, compositing and encoding (in seconds)
    pub render_duration: Histogram,
}

/// Global singleton instance of metrics
static METRICS: OnceLock<DeliveryMetrics> = OnceLock::new();

impl DeliveryMetrics {
    /// Initialize and return the global metrics instance
    ///
    /// Subsequent calls return the same instance.
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| DeliveryMetrics {
            responses: register_int_counter_vec!(
                "image_proxy_responses_total",
                "Total number of image responses by status code",
                &["status"]
            )
            .expect("Failed to register image_proxy_responses_total metric"),
            cache_lookups: register_int_counter_vec!(
                "image_proxy_cache_lookups_total",
                "Render cache lookups by result",
                &["result"]
            )
            .expect("Failed to register image_proxy_cache_lookups_total metric"),
            renders: register_int_counter_vec!(
                "image_proxy_renders_total",
                "Completed renders by watermark mode",
                &["mode"]
            )
            .expect("Failed to register image_proxy_renders_total metric"),
            degraded_renders: register_int_counter!(
                "image_proxy_degraded_renders_total",
                "Renders served without the requested watermark"
            )
            .expect("Failed to register image_proxy_degraded_renders_total metric"),
            cache_write_failures: register_int_counter!(
                "image_proxy_cache_write_failures_total",
                "Render cache writes that failed"
            )
            .expect("Failed to register image_proxy_cache_write_failures_total metric"),
            legacy_fallbacks: register_int_counter!(
                "image_proxy_legacy_fallbacks_total",
                "Source images found only in the legacy namespace"
            )
            .expect("Failed to register image_proxy_legacy_fallbacks_total metric"),
            source_failures: register_int_counter_vec!(
                "image_proxy_source_failures_total",
                "Source resolution failures by kind",
                &["kind"]
            )
            .expect("Failed to register image_proxy_source_failures_total metric"),
            render_duration: register_histogram!(
                "image_proxy_render_duration_seconds",
                "Duration of decode, composite and encode in seconds",
                vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
            )
            .expect("Failed to register image_proxy_render_duration_seconds metric"),
        })
    }

    pub fn record_response(&self, status: u16) {
        self.responses
            .with_label_values(&[&status.to_string()])
            .inc();
    }

    pub fn record_cache_lookup(&self, hit: bool) {
        self.cache_lookups
            .with_label_values(&[if hit { "hit" } else { "miss" }])
            .inc();
    }

    pub fn record_render(&self, mode: &str) {
        self.renders.with_label_values(&[mode]).inc();
    }

    pub fn record_source_failure(&self, kind: &str) {
        self.source_failures.with_label_values(&[kind]).inc();
    }
}

/// Export all registered metrics in the Prometheus text format
pub fn export_prometheus() -> String {
    // Make sure our metrics are registered even before the first request
    let _ = DeliveryMetrics::global();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
