// Proxy module - Pingora ProxyHttp implementation
//
// Every request is answered in `request_filter`; nothing is proxied upstream.

use async_trait::async_trait;
use bytes::Bytes;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::Result;
use pingora_http::ResponseHeader;
use pingora_proxy::{ProxyHttp, Session};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::delivery::ImageService;
use crate::error::ProxyError;
use crate::metrics::DeliveryMetrics;

pub mod helpers;
pub mod special_endpoints;

use helpers::{get_client_ip, is_image_method, sends_body, Route};
use special_endpoints::EndpointResponse;

/// Per-request state
pub struct RequestContext {
    request_id: String,
    start_time: Instant,
    route: Route,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            start_time: Instant::now(),
            route: Route::NotFound,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn route(&self) -> Route {
        self.route
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Image delivery proxy
pub struct ImageProxy {
    service: Arc<ImageService>,
    request_semaphore: Arc<Semaphore>,
    start_time: Instant,
}

impl ImageProxy {
    pub fn new(config: &Config) -> std::result::Result<Self, ProxyError> {
        let service = ImageService::from_config(config)?;
        Ok(Self::with_service(
            Arc::new(service),
            config.server.max_concurrent_requests,
        ))
    }

    pub fn with_service(service: Arc<ImageService>, max_concurrent_requests: usize) -> Self {
        Self {
            service,
            request_semaphore: Arc::new(Semaphore::new(max_concurrent_requests)),
            start_time: Instant::now(),
        }
    }

    pub fn service(&self) -> Arc<ImageService> {
        self.service.clone()
    }

    pub fn available_permits(&self) -> usize {
        self.request_semaphore.available_permits()
    }
}

async fn write_response(
    session: &mut Session,
    status: u16,
    headers: &[(&'static str, String)],
    body: Bytes,
    include_body: bool,
) -> Result<()> {
    let mut header = ResponseHeader::build(status, Some(headers.len() + 1))?;
    for (name, value) in headers {
        header.insert_header(*name, value.as_str())?;
    }
    header.insert_header("Content-Length", body.len().to_string())?;

    if include_body && !body.is_empty() {
        session
            .write_response_header(Box::new(header), false)
            .await?;
        session.write_response_body(Some(body), true).await?;
    } else {
        session.write_response_header(Box::new(header), true).await?;
    }
    Ok(())
}

async fn write_endpoint_response(
    session: &mut Session,
    response: EndpointResponse,
    include_body: bool,
) -> Result<()> {
    let mut headers = vec![("Content-Type", response.content_type.to_string())];
    headers.extend(response.headers);
    write_response(
        session,
        response.status,
        &headers,
        Bytes::from(response.body),
        include_body,
    )
    .await
}

#[async_trait]
impl ProxyHttp for ImageProxy {
    type CTX = RequestContext;

    fn new_ctx(&self) -> Self::CTX {
        RequestContext::new()
    }

    /// Never reached: every request is answered in `request_filter`.
    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        tracing::error!(request_id = %ctx.request_id(), "Request reached upstream selection");
        Err(pingora_core::Error::explain(
            pingora_core::ErrorType::InternalError,
            "image proxy has no upstream",
        ))
    }

    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        let req = session.req_header();
        let path = req.uri.path().to_string();
        let method = req.method.as_str().to_string();
        let query = req.uri.query().map(str::to_string);
        let include_body = sends_body(&method);
        ctx.route = Route::classify(&path);

        // Check concurrency limit first
        let _permit = match self.request_semaphore.try_acquire() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    path = %path,
                    "Rejecting request due to max concurrent requests reached"
                );
                DeliveryMetrics::global().record_response(503);
                let response = special_endpoints::handle_overloaded();
                write_endpoint_response(session, response, include_body).await?;
                return Ok(true);
            }
        };

        match ctx.route {
            Route::Health => {
                let response = special_endpoints::handle_health(self.start_time);
                write_endpoint_response(session, response, include_body).await?;
            }
            Route::Metrics => {
                let response = special_endpoints::handle_metrics();
                write_endpoint_response(session, response, include_body).await?;
            }
            Route::NotFound => {
                DeliveryMetrics::global().record_response(404);
                write_endpoint_response(session, special_endpoints::handle_not_found(), include_body)
                    .await?;
            }
            Route::Image if !is_image_method(&method) => {
                DeliveryMetrics::global().record_response(405);
                let response = special_endpoints::handle_method_not_allowed();
                write_endpoint_response(session, response, include_body).await?;
            }
            Route::Image => {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    client_ip = %get_client_ip(session),
                    method = %method,
                    "Image request"
                );
                let response = self.service.handle(query.as_deref()).await;
                write_response(
                    session,
                    response.status,
                    &response.headers,
                    response.body,
                    include_body,
                )
                .await?;
            }
        }

        Ok(true)
    }

    async fn logging(
        &self,
        session: &mut Session,
        e: Option<&pingora_core::Error>,
        ctx: &mut Self::CTX,
    ) {
        let status = session
            .response_written()
            .map(|resp| resp.status.as_u16())
            .unwrap_or(0);

        if let Some(e) = e {
            tracing::error!(
                request_id = %ctx.request_id(),
                route = ctx.route().name(),
                error = %e,
                "Request ended with error"
            );
        } else {
            tracing::debug!(
                request_id = %ctx.request_id(),
                route = ctx.route().name(),
                status,
                duration_ms = ctx.start_time.elapsed().as_millis() as u64,
                "Request completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_YAML: &str = r#"
server:
  address: "127.0.0.1"
  port: 8080
  max_concurrent_requests: 7
storage:
  backend: memory
"#;

    #[test]
    fn test_proxy_from_config() {
        let config = Config::from_yaml_with_env(TEST_YAML).unwrap();
        let proxy = ImageProxy::new(&config).unwrap();
        assert_eq!(proxy.available_permits(), 7);
    }

    #[test]
    fn test_request_context_ids_are_unique() {
        let a = RequestContext::new();
        let b = RequestContext::new();
        assert_ne!(a.request_id(), b.request_id());
        assert_eq!(a.route(), Route::NotFound);
    }
}
