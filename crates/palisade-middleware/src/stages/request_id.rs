//! Request ID middleware.
//!
//! Every request gets a fresh random identifier, hex-encoded. It is stored
//! in the [`MiddlewareContext`] for logging and echoed in the `X-Request-ID`
//! response header so clients can quote it in support requests.
//!
//! Incoming `X-Request-ID` headers are ignored; clients cannot choose their
//! own identifier.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};
use http::HeaderValue;
use rand::RngCore;

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Random bytes per identifier unless configured otherwise.
pub const DEFAULT_ID_BYTES: usize = 16;

/// Middleware that assigns request IDs.
///
/// # Example
///
/// ```
/// use palisade_middleware::stages::RequestIdMiddleware;
///
/// let id = RequestIdMiddleware::new().generate();
/// assert_eq!(id.len(), 32);
/// assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
///
/// let short = RequestIdMiddleware::with_bytes(4).generate();
/// assert_eq!(short.len(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestIdMiddleware {
    bytes: usize,
}

impl RequestIdMiddleware {
    /// Creates the middleware with [`DEFAULT_ID_BYTES`] random bytes per ID.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: DEFAULT_ID_BYTES,
        }
    }

    /// Creates the middleware with `bytes` random bytes per ID (at least one).
    #[must_use]
    pub fn with_bytes(bytes: usize) -> Self {
        Self { bytes: bytes.max(1) }
    }

    /// Returns the number of random bytes per ID.
    #[must_use]
    pub const fn bytes(&self) -> usize {
        self.bytes
    }

    /// Generates a new identifier.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut buf = vec![0u8; self.bytes];
        rand::thread_rng().fill_bytes(&mut buf);
        hex::encode(buf)
    }
}

impl Default for RequestIdMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let request_id = self.generate();
            ctx.set_request_id(request_id.clone());
            tracing::trace!(request_id = %request_id, path = %request.uri().path(), "Assigned request ID");

            let mut response = next.run(ctx, request).await;

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use std::collections::HashSet;

    fn create_test_request() -> Request {
        http::Request::builder()
            .uri("/test")
            .header(REQUEST_ID_HEADER, "client-chosen")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[test]
    fn test_generated_ids_are_hex_and_distinct() {
        let middleware = RequestIdMiddleware::new();
        let ids: HashSet<String> = (0..100).map(|_| middleware.generate()).collect();
        assert_eq!(ids.len(), 100);
        assert!(ids
            .iter()
            .all(|id| id.len() == 32 && id.chars().all(|c| c.is_ascii_hexdigit())));
    }

    #[test]
    fn test_with_bytes_clamps_to_one() {
        assert_eq!(RequestIdMiddleware::with_bytes(0).bytes(), 1);
        assert_eq!(RequestIdMiddleware::with_bytes(0).generate().len(), 2);
        assert_eq!(RequestIdMiddleware::default().bytes(), DEFAULT_ID_BYTES);
    }

    #[tokio::test]
    async fn test_sets_context_and_response_header() {
        let middleware = RequestIdMiddleware::new();
        let mut ctx = MiddlewareContext::new();

        let next = Next::handler(|ctx, _req| {
            let seen = ctx.request_id().unwrap_or_default().to_string();
            Box::pin(async move { Response::text(StatusCode::OK, &seen) })
        });

        let response = middleware.process(&mut ctx, create_test_request(), next).await;

        let header = response.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_string();
        assert_ne!(header, "client-chosen");
        assert_eq!(ctx.request_id(), Some(header.as_str()));
    }

    #[tokio::test]
    async fn test_header_set_on_short_circuit_responses() {
        let middleware = RequestIdMiddleware::new();
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Response::text(StatusCode::UNAUTHORIZED, "no") })
        });

        let response = middleware.process(&mut ctx, create_test_request(), next).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }
}
