//! Common types used throughout the middleware pipeline.
//!
//! This module re-exports HTTP request and response types used by middleware.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use serde_json::Value;

/// The HTTP request type used in the middleware pipeline.
///
/// This is a standard `http::Request` with a `Full<Bytes>` body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the middleware pipeline.
///
/// This is a standard `http::Response` with a `Full<Bytes>` body.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building responses.
pub trait ResponseExt {
    /// Creates a JSON response with the given status code.
    fn json(status: StatusCode, body: &Value) -> Response;

    /// Creates a plain-text response with the given status code.
    fn text(status: StatusCode, message: &str) -> Response;
}

impl ResponseExt for Response {
    fn json(status: StatusCode, body: &Value) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::from(body.to_string())));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }

    fn text(status: StatusCode, message: &str) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::from(message.to_string())));
        *response.status_mut() = status;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
