use std::time::Instant;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use common_auth::AuthState;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::chain::HttpMiddleware;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The request id as a UUID, when the header holds one.
pub fn request_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
}

/// Opens a span per request and logs status and latency on the way out.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogging;

#[async_trait]
impl HttpMiddleware for RequestLogging {
    fn name(&self) -> &str {
        "request_logging"
    }

    async fn handle(&self, req: Request, next: Next) -> Response {
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-")
            .to_owned();
        let span = info_span!(
            "http_request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
        );
        let started = Instant::now();
        let response = next.run(req).instrument(span.clone()).await;
        span.in_scope(|| {
            info!(
                status = response.status().as_u16(),
                latency_ms = started.elapsed().as_millis() as u64,
                "request completed"
            );
        });
        response
    }
}

/// Ensures every request carries `x-request-id`, generating a v4 UUID when
/// the caller did not send one, and echoes it on the response.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestId;

#[async_trait]
impl HttpMiddleware for RequestId {
    fn name(&self) -> &str {
        "request_id"
    }

    async fn handle(&self, mut req: Request, next: Next) -> Response {
        let header = HeaderName::from_static(REQUEST_ID_HEADER);
        let id = match req.headers().get(&header) {
            Some(existing) => existing.clone(),
            None => {
                // a hyphenated uuid is always a valid header value
                let generated = HeaderValue::from_str(&Uuid::new_v4().to_string())
                    .unwrap_or_else(|_| HeaderValue::from_static("-"));
                req.headers_mut().insert(header.clone(), generated.clone());
                generated
            }
        };
        let mut response = next.run(req).await;
        response.headers_mut().insert(header, id);
        response
    }
}

/// Bearer-token authentication as a chain member.
#[derive(Clone)]
pub struct Authenticate(pub AuthState);

#[async_trait]
impl HttpMiddleware for Authenticate {
    fn name(&self) -> &str {
        "authenticate"
    }

    async fn handle(&self, req: Request, next: Next) -> Response {
        common_auth::authenticate(&self.0, req, next).await
    }
}
