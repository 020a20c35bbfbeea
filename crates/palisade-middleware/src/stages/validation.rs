//! Request validation.
//!
//! Checks one request fragment (body, query string or headers) against a
//! [`Schema`]. On success the coerced fragment is stored in the context as a
//! [`ValidatedFragment`] and the request itself continues unchanged. On
//! failure the request is answered with `400 Validation error`.
//!
//! Fragments are read as follows:
//!
//! - **Body**: JSON, or `application/x-www-form-urlencoded` when the request
//!   says so. An empty body is an empty object.
//! - **Query**: the query string as an object of strings; repeated keys
//!   become arrays.
//! - **Headers**: an object keyed by lower-case header name; repeated
//!   headers are joined with `", "`.

use crate::boundary::{Boundary, Guard};
use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Next};
use crate::schema::Schema;
use crate::types::{Request, Response};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http_body_util::BodyExt;
use palisade_core::validation::codes;
use palisade_core::{PipelineResult, ValidationError, ValidationIssue};
use palisade_telemetry::log_stage_passed;
use serde_json::{Map, Value};
use std::fmt;

/// Which part of the request is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequestSource {
    /// The request body.
    #[default]
    Body,
    /// The query string.
    Query,
    /// The request headers.
    Headers,
}

impl RequestSource {
    /// Returns the source name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Query => "query",
            Self::Headers => "headers",
        }
    }
}

impl fmt::Display for RequestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fragment that passed validation, after coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFragment {
    /// Where the fragment came from.
    pub source: RequestSource,
    /// The coerced value.
    pub value: Value,
}

impl ValidatedFragment {
    /// Deserializes the coerced value.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.value.clone())
    }
}

/// Validates a request fragment against a schema.
///
/// # Example
///
/// ```
/// use palisade_middleware::schema::rules;
/// use palisade_middleware::stages::{RequestSource, RequestValidator};
///
/// let validate_query = RequestValidator::new(rules::object().field("id", rules::uuid()))
///     .source(RequestSource::Query)
///     .into_middleware();
/// ```
pub struct RequestValidator<S> {
    schema: S,
    source: RequestSource,
}

impl<S: Schema> RequestValidator<S> {
    /// Creates a validator for the request body.
    pub fn new(schema: S) -> Self {
        Self {
            schema,
            source: RequestSource::Body,
        }
    }

    /// Selects the validated fragment.
    pub fn source(mut self, source: RequestSource) -> Self {
        self.source = source;
        self
    }

    /// Wraps the validator in a [`Boundary`] with the default formatter.
    pub fn into_middleware(self) -> Boundary<Self> {
        Boundary::new(self)
    }
}

impl<S> fmt::Debug for RequestValidator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestValidator")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl<S: Schema> Guard for RequestValidator<S> {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn guard<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult<Response>> {
        Box::pin(async move {
            let mut value = extract_fragment(&request, self.source).await?;
            self.schema.validate(&mut value).await?;

            log_stage_passed!(self.name(), ctx.log_request_id());
            ctx.set_extension(ValidatedFragment {
                source: self.source,
                value,
            });
            Ok(next.run(ctx, request).await)
        })
    }
}

/// Reads the selected fragment as JSON.
pub async fn extract_fragment(request: &Request, source: RequestSource) -> Result<Value, ValidationError> {
    match source {
        RequestSource::Body => {
            let bytes = match request.body().clone().collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };
            parse_body(request, &bytes)
        }
        RequestSource::Query => parse_pairs(request.uri().query().unwrap_or_default(), "Malformed query string"),
        RequestSource::Headers => Ok(headers_to_value(request)),
    }
}

fn parse_body(request: &Request, bytes: &Bytes) -> Result<Value, ValidationError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    let is_form = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    if is_form {
        let text = std::str::from_utf8(bytes).map_err(|_| malformed("Malformed form body"))?;
        return parse_pairs(text, "Malformed form body");
    }

    serde_json::from_slice(bytes).map_err(|e| {
        tracing::trace!(error = %e, "Request body is not valid JSON");
        malformed("Malformed JSON body")
    })
}

fn parse_pairs(input: &str, message: &str) -> Result<Value, ValidationError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(input).map_err(|_| malformed(message))?;

    let mut map = Map::new();
    for (key, value) in pairs {
        match map.get_mut(&key) {
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                map.insert(key, Value::String(value));
            }
        }
    }
    Ok(Value::Object(map))
}

fn headers_to_value(request: &Request) -> Value {
    let mut map = Map::new();
    for name in request.headers().keys() {
        let values: Vec<&str> = request
            .headers()
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        if !values.is_empty() {
            map.insert(name.as_str().to_string(), Value::String(values.join(", ")));
        }
    }
    Value::Object(map)
}

fn malformed(message: &str) -> ValidationError {
    ValidationError::single(ValidationIssue::new(Vec::new(), codes::INVALID_JSON, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Middleware;
    use crate::schema::rules;
    use crate::types::ResponseExt;
    use http::StatusCode;
    use http_body_util::Full;
    use palisade_core::PathSegment;
    use serde::Deserialize;
    use serde_json::json;

    fn body_request(content_type: &str, body: &'static str) -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/users")
            .header(CONTENT_TYPE, content_type)
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    fn signup() -> crate::schema::ObjectSchema {
        rules::object()
            .field("name", rules::string("name"))
            .field("email", rules::email())
    }

    async fn run<S: Schema>(validator: RequestValidator<S>, request: Request) -> (Response, MiddlewareContext) {
        let middleware = validator.into_middleware();
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, req| {
            Box::pin(async move {
                let bytes = req.into_body().collect().await.unwrap().to_bytes();
                Response::text(StatusCode::OK, std::str::from_utf8(&bytes).unwrap())
            })
        });
        let response = middleware.process(&mut ctx, request, next).await;
        (response, ctx)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_is_stored_coerced_and_request_untouched() {
        let raw = r#"{"name": 7, "email": "ada@example.com", "extra": true}"#;
        let (response, ctx) = run(RequestValidator::new(signup()), body_request("application/json", raw)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let forwarded = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&forwarded[..], raw.as_bytes());

        let fragment = ctx.get_extension::<ValidatedFragment>().unwrap();
        assert_eq!(fragment.source, RequestSource::Body);
        assert_eq!(fragment.value, json!({"name": "7", "email": "ada@example.com"}));

        #[derive(Deserialize)]
        struct Signup {
            name: String,
        }
        assert_eq!(fragment.deserialize::<Signup>().unwrap().name, "7");
    }

    #[tokio::test]
    async fn test_invalid_body_is_rejected() {
        let (response, ctx) = run(
            RequestValidator::new(signup()),
            body_request("application/json", r#"{"name": "", "email": "nope"}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!ctx.has_extension::<ValidatedFragment>());
        assert_eq!(
            body_json(response).await,
            json!({
                "status": 400,
                "message": "Validation error",
                "error": {
                    "name": {"code": "too_small", "message": "name is required"},
                    "email": {"code": "invalid_string", "message": "Invalid email"}
                }
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let (response, _) = run(RequestValidator::new(signup()), body_request("application/json", "{nope")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"][""]["code"], "invalid_json");
    }

    #[tokio::test]
    async fn test_empty_body_reports_required_fields() {
        let (response, _) = run(RequestValidator::new(signup()), body_request("application/json", "")).await;
        let body = body_json(response).await;
        assert_eq!(body["error"]["name"]["message"], "Required");
        assert_eq!(body["error"]["email"]["message"], "Required");
    }

    #[tokio::test]
    async fn test_form_body() {
        let (response, ctx) = run(
            RequestValidator::new(signup()),
            body_request("application/x-www-form-urlencoded", "name=Ada&email=ada%40example.com"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            ctx.get_extension::<ValidatedFragment>().unwrap().value,
            json!({"name": "Ada", "email": "ada@example.com"})
        );
    }

    #[tokio::test]
    async fn test_query_source() {
        let schema = rules::object()
            .field("id", rules::uuid())
            .field("tag", rules::array(rules::string("tag")));
        let request = http::Request::builder()
            .uri("/items?id=67e55044-10b1-426f-9247-bb680e5fe0c8&tag=a&tag=b")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let (response, ctx) = run(RequestValidator::new(schema).source(RequestSource::Query), request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let fragment = ctx.get_extension::<ValidatedFragment>().unwrap();
        assert_eq!(fragment.source, RequestSource::Query);
        assert_eq!(fragment.value["tag"], json!(["a", "b"]));
    }

    #[tokio::test]
    async fn test_headers_source() {
        let schema = rules::object()
            .field("x-tenant", rules::uuid())
            .passthrough();
        let request = http::Request::builder()
            .uri("/")
            .header("X-Tenant", "not-a-uuid")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let (response, _) = run(RequestValidator::new(schema).source(RequestSource::Headers), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["x-tenant"]["message"], "Invalid uuid");
    }

    struct ReservedNames;

    impl Schema for ReservedNames {
        fn validate<'a>(&'a self, value: &'a mut Value) -> BoxFuture<'a, Result<(), ValidationError>> {
            Box::pin(async move {
                tokio::task::yield_now().await;
                if value.get("name").and_then(Value::as_str) == Some("admin") {
                    return Err(ValidationError::single(ValidationIssue::new(
                        vec![PathSegment::from("name")],
                        codes::CUSTOM,
                        "Name is taken",
                    )));
                }
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_async_schema() {
        let (response, _) = run(
            RequestValidator::new(ReservedNames),
            body_request("application/json", r#"{"name": "admin"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["name"]["message"], "Name is taken");
    }

    #[test]
    fn test_source_names() {
        assert_eq!(RequestSource::default(), RequestSource::Body);
        assert_eq!(RequestSource::Query.to_string(), "query");
        assert_eq!(RequestSource::Headers.as_str(), "headers");
    }
}
