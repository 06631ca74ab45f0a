//! Proxy utility functions.
//!
//! - Route classification
//! - HEAD handling
//! - Client IP detection (X-Forwarded-For aware)

use pingora_proxy::Session;

/// Paths served by the image delivery handler
pub const IMAGE_PATHS: &[&str] = &["/image", "/api/image"];

/// What a request path maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Image,
    Health,
    Metrics,
    NotFound,
}

impl Route {
    /// Classify a request path. Trailing slashes are ignored.
    pub fn classify(path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "/health" => Route::Health,
            "/metrics" => Route::Metrics,
            p if IMAGE_PATHS.contains(&p) => Route::Image,
            _ => Route::NotFound,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Route::Image => "image",
            Route::Health => "health",
            Route::Metrics => "metrics",
            Route::NotFound => "not_found",
        }
    }
}

/// Methods accepted on the image route
pub fn is_image_method(method: &str) -> bool {
    matches!(method, "GET" | "HEAD")
}

/// Whether a response to `method` carries a body. Applies to every
/// response, including errors and overload rejections.
pub fn sends_body(method: &str) -> bool {
    method != "HEAD"
}

/// Extract client IP address from session (X-Forwarded-For aware).
///
/// The header can contain multiple IPs: `"client, proxy1, proxy2"`.
/// The first IP is the original client, which is what we return.
pub fn get_client_ip(session: &Session) -> String {
    if let Some(forwarded_for) = session
        .req_header()
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(client_ip) = forwarded_for.split(',').next() {
            return client_ip.trim().to_string();
        }
    }

    session
        .client_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
