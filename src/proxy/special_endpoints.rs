//! Built-in endpoint handlers.
//!
//! - `/health` - liveness with uptime and version
//! - `/metrics` - Prometheus text exposition
//!
//! Functions return `EndpointResponse` instead of writing to the session so
//! they stay testable; the caller writes the response.

use std::time::Instant;

use crate::constants::RETRY_AFTER_SECS;
use crate::metrics::export_prometheus;

/// Response from a built-in endpoint handler.
#[derive(Debug, Clone)]
pub struct EndpointResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: &'static str,
    /// Extra headers beyond Content-Type and Content-Length
    pub headers: Vec<(&'static str, String)>,
    /// Response body
    pub body: String,
}

impl EndpointResponse {
    /// Create a JSON response with the given status and body.
    pub fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "application/json",
            headers: Vec::new(),
            body,
        }
    }

    /// Create a plain text response.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Create a Prometheus exposition response.
    pub fn prometheus(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/plain; version=0.0.4",
            headers: Vec::new(),
            body,
        }
    }

    fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// Generate response for /health endpoint.
pub fn handle_health(start_time: Instant) -> EndpointResponse {
    let uptime_seconds = start_time.elapsed().as_secs();
    let version = env!("CARGO_PKG_VERSION");

    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": uptime_seconds,
        "version": version
    })
    .to_string();

    EndpointResponse::json(200, body)
}

/// Generate response for /metrics endpoint.
pub fn handle_metrics() -> EndpointResponse {
    EndpointResponse::prometheus(export_prometheus())
}

pub fn handle_not_found() -> EndpointResponse {
    EndpointResponse::text(404, "Not found")
}

/// 405 for anything but GET or HEAD on an image route.
pub fn handle_method_not_allowed() -> EndpointResponse {
    EndpointResponse::text(405, "Method not allowed").with_header("Allow", "GET, HEAD")
}

/// 503 when the concurrency limit is reached.
pub fn handle_overloaded() -> EndpointResponse {
    EndpointResponse::text(
        503,
        format!(
            "Server has reached maximum concurrent request limit. Please retry after {} seconds.",
            RETRY_AFTER_SECS
        ),
    )
    .with_header("Retry-After", RETRY_AFTER_SECS.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_response_json() {
        let response = EndpointResponse::json(200, r#"{"status":"ok"}"#.to_string());
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "application/json");
        assert_eq!(response.body, r#"{"status":"ok"}"#);
        assert!(response.headers.is_empty());
    }

    #[test]
    fn test_handle_health() {
        let response = handle_health(Instant::now());

        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "application/json");

        let parsed: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(parsed["status"], "healthy");
        assert!(parsed["uptime_seconds"].is_u64());
        assert_eq!(parsed["version"], env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_handle_metrics() {
        crate::metrics::DeliveryMetrics::global().record_response(200);

        let response = handle_metrics();
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "text/plain; version=0.0.4");
        assert!(response.body.contains("image_proxy_responses_total"));
    }

    #[test]
    fn test_method_not_allowed_lists_allowed_methods() {
        let response = handle_method_not_allowed();
        assert_eq!(response.status, 405);
        assert_eq!(
            response.headers,
            vec![("Allow", "GET, HEAD".to_string())]
        );
    }

    #[test]
    fn test_overloaded_sets_retry_after() {
        let response = handle_overloaded();
        assert_eq!(response.status, 503);
        assert_eq!(response.headers[0].0, "Retry-After");
        assert_eq!(response.headers[0].1, RETRY_AFTER_SECS.to_string());
    }
}
