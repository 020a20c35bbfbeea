//! Rate limiting middleware.
//!
//! Counts requests per client in fixed windows and answers `429 Too Many
//! Requests` once a client has used up its allowance. Defaults: 100
//! requests per 15 minutes, keyed by the peer address of the connection.
//!
//! Forwarding headers are client-controlled and ignored unless the service
//! runs behind a proxy that sets them and [`RateLimiterConfig::trust_proxy`]
//! is enabled.
//!
//! ## Response Headers
//!
//! Unless disabled with [`RateLimiterConfig::standard_headers`], every
//! response carries
//!
//! - `X-RateLimit-Limit`: maximum requests per window
//! - `X-RateLimit-Remaining`: requests left in the current window
//! - `X-RateLimit-Reset`: Unix timestamp when the window resets
//!
//! and rejections also carry `Retry-After`.
//!
//! ## Example
//!
//! ```
//! use palisade_middleware::stages::{create_rate_limiter, RateLimiterConfig};
//! use std::time::Duration;
//!
//! let limiter = create_rate_limiter(
//!     RateLimiterConfig::default()
//!         .window(Duration::from_secs(60))
//!         .max(10)
//!         .skip(|request| request.uri().path() == "/health"),
//! );
//! ```

use crate::boundary::{Boundary, Guard};
use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Next};
use crate::types::{Request, Response, ResponseExt};
use dashmap::DashMap;
use http::{HeaderValue, StatusCode};
use palisade_core::{PipelineError, PipelineResult};
use serde_json::{json, Value};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Rate limit header names.
pub mod headers {
    /// Maximum requests allowed in the window.
    pub const LIMIT: &str = "x-ratelimit-limit";
    /// Remaining requests in current window.
    pub const REMAINING: &str = "x-ratelimit-remaining";
    /// Unix timestamp when the window resets.
    pub const RESET: &str = "x-ratelimit-reset";
    /// Seconds to wait before retrying (on 429).
    pub const RETRY_AFTER: &str = "retry-after";
}

/// Default window length: 15 minutes.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Default number of requests allowed per window.
pub const DEFAULT_MAX: u64 = 100;

/// How to extract the rate limit key from a request.
#[derive(Clone, Default)]
pub enum KeyExtractor {
    /// Peer address from the context.
    #[default]
    Ip,
    /// Client IP as reported by a trusted proxy: first `X-Forwarded-For`
    /// entry, then `X-Real-IP`, then the peer address.
    ForwardedIp,
    /// Use a specific header value as the key.
    Header(String),
    /// Use the `sub` claim of the verified credential.
    Subject,
    /// Use a custom function to extract the key.
    Custom(Arc<dyn Fn(&Request) -> Option<String> + Send + Sync>),
    /// Global rate limit (single key for all requests).
    Global,
}

impl fmt::Debug for KeyExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip => write!(f, "KeyExtractor::Ip"),
            Self::ForwardedIp => write!(f, "KeyExtractor::ForwardedIp"),
            Self::Header(h) => f.debug_tuple("KeyExtractor::Header").field(h).finish(),
            Self::Subject => write!(f, "KeyExtractor::Subject"),
            Self::Custom(_) => write!(f, "KeyExtractor::Custom(<fn>)"),
            Self::Global => write!(f, "KeyExtractor::Global"),
        }
    }
}

impl KeyExtractor {
    /// Extracts the key. `None` exempts the request from limiting.
    pub fn extract(&self, request: &Request, ctx: &MiddlewareContext) -> Option<String> {
        match self {
            Self::Ip => Some(peer_key(ctx)),
            Self::ForwardedIp => {
                let headers = request.headers();
                if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
                    if let Some(first) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
                        return Some(first.to_string());
                    }
                }
                if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
                    return Some(real_ip.trim().to_string());
                }
                Some(peer_key(ctx))
            }
            Self::Header(name) => request
                .headers()
                .get(name.as_str())
                .and_then(|v| v.to_str().ok())
                .map(String::from),
            Self::Subject => ctx
                .claims()
                .and_then(|claims| claims.subject())
                .map(String::from),
            Self::Custom(f) => f(request),
            Self::Global => Some("global".to_string()),
        }
    }
}

fn peer_key(ctx: &MiddlewareContext) -> String {
    ctx.client_addr()
        .map_or_else(|| "unknown-ip".to_string(), |addr| addr.to_string())
}

/// Settings of a rate limiter.
#[derive(Clone)]
pub struct RateLimiterConfig {
    /// Window length.
    pub window: Duration,
    /// Requests allowed per key and window.
    pub max: u64,
    /// Body sent with rejections. Defaults to [`RateLimiterConfig::default_message`].
    pub message: Option<Value>,
    /// How requests are grouped.
    pub key_extractor: KeyExtractor,
    /// Requests for which this returns `true` are never counted.
    pub skip: Option<Arc<dyn Fn(&Request) -> bool + Send + Sync>>,
    /// Whether to add the `X-RateLimit-*` headers.
    pub standard_headers: bool,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            max: DEFAULT_MAX,
            message: None,
            key_extractor: KeyExtractor::default(),
            skip: None,
            standard_headers: true,
        }
    }
}

impl fmt::Debug for RateLimiterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiterConfig")
            .field("window", &self.window)
            .field("max", &self.max)
            .field("message", &self.message)
            .field("key_extractor", &self.key_extractor)
            .field("skip", &self.skip.is_some())
            .field("standard_headers", &self.standard_headers)
            .finish()
    }
}

impl RateLimiterConfig {
    /// Sets the window length.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Sets the number of requests allowed per window.
    pub fn max(mut self, max: u64) -> Self {
        self.max = max;
        self
    }

    /// Sets the rejection body. A string is sent as plain text, anything
    /// else as JSON.
    pub fn message(mut self, message: impl Into<Value>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Uses the peer address as the rate limit key.
    pub fn per_ip(mut self) -> Self {
        self.key_extractor = KeyExtractor::Ip;
        self
    }

    /// Keys on the client address reported by `X-Forwarded-For` /
    /// `X-Real-IP` instead of the peer address.
    ///
    /// Only enable this behind a proxy that overwrites those headers; any
    /// client can otherwise pick its own key.
    pub fn trust_proxy(mut self, enabled: bool) -> Self {
        self.key_extractor = if enabled {
            KeyExtractor::ForwardedIp
        } else {
            KeyExtractor::Ip
        };
        self
    }

    /// Uses a header value as the rate limit key.
    pub fn per_header(mut self, header_name: impl Into<String>) -> Self {
        self.key_extractor = KeyExtractor::Header(header_name.into().to_ascii_lowercase());
        self
    }

    /// Uses the credential subject as the rate limit key.
    ///
    /// Place the limiter after the auth guard; anonymous requests are not
    /// counted.
    pub fn per_subject(mut self) -> Self {
        self.key_extractor = KeyExtractor::Subject;
        self
    }

    /// Uses a global rate limit (single limit for all requests).
    pub fn global(mut self) -> Self {
        self.key_extractor = KeyExtractor::Global;
        self
    }

    /// Uses a custom key extractor function.
    pub fn key_extractor<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request) -> Option<String> + Send + Sync + 'static,
    {
        self.key_extractor = KeyExtractor::Custom(Arc::new(f));
        self
    }

    /// Sets a predicate to skip rate limiting for certain requests.
    pub fn skip<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.skip = Some(Arc::new(f));
        self
    }

    /// Enables or disables the `X-RateLimit-*` headers.
    pub fn standard_headers(mut self, enabled: bool) -> Self {
        self.standard_headers = enabled;
        self
    }

    /// The rejection body used when no message is configured.
    ///
    /// ```
    /// use palisade_middleware::stages::RateLimiterConfig;
    /// use serde_json::json;
    ///
    /// assert_eq!(
    ///     RateLimiterConfig::default().default_message(),
    ///     json!({
    ///         "error": "Too many requests, please try again after 15 minutes.",
    ///         "status": 429
    ///     })
    /// );
    /// ```
    pub fn default_message(&self) -> Value {
        json!({
            "error": format!(
                "Too many requests, please try again after {} minutes.",
                format_minutes(self.window)
            ),
            "status": StatusCode::TOO_MANY_REQUESTS.as_u16(),
        })
    }

    fn rejection_body(&self) -> Value {
        self.message.clone().unwrap_or_else(|| self.default_message())
    }
}

/// Renders a window in minutes: whole numbers without a fraction, anything
/// else with as many decimals as needed.
fn format_minutes(window: Duration) -> String {
    let millis = window.as_millis();
    if millis % 60_000 == 0 {
        (millis / 60_000).to_string()
    } else {
        (millis as f64 / 60_000.0).to_string()
    }
}

/// Errors raised by a [`RateLimitStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("rate limit store unavailable: {0}")]
    Unavailable(String),
}

/// Counter state after recording a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// Hits in the current window, this one included.
    pub count: u64,
    /// Time until the window resets.
    pub reset_in: Duration,
}

/// Storage for per-key hit counters.
///
/// The in-memory [`MemoryStore`] is the default. Deployments running more
/// than one process need a shared implementation.
pub trait RateLimitStore: Send + Sync + 'static {
    /// Records a hit for `key` and returns the updated counter.
    fn hit<'a>(&'a self, key: &'a str, window: Duration) -> BoxFuture<'a, Result<Hit, StoreError>>;

    /// Forgets the counter for `key`.
    fn reset<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>>;
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: u64,
    started: Instant,
    window: Duration,
}

/// Process-local fixed-window store.
///
/// Expired windows are swept out during [`RateLimitStore::hit`], at most
/// once per window length.
#[derive(Debug, Default)]
pub struct MemoryStore {
    windows: DashMap<String, WindowState>,
    next_sweep: Mutex<Option<Instant>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Returns `true` if no key is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Drops every key whose window has ended.
    pub fn prune(&self) {
        self.evict_expired(Instant::now());
    }

    fn evict_expired(&self, now: Instant) {
        self.windows
            .retain(|_, state| now.duration_since(state.started) < state.window);
    }

    fn sweep_if_due(&self, now: Instant, window: Duration) {
        // Another caller holding the lock is already sweeping.
        let Ok(mut next_sweep) = self.next_sweep.try_lock() else {
            return;
        };
        match *next_sweep {
            Some(due) if now < due => {}
            Some(_) => {
                self.evict_expired(now);
                *next_sweep = Some(now + window);
            }
            None => *next_sweep = Some(now + window),
        }
    }

    fn record(&self, key: &str, window: Duration) -> Hit {
        let now = Instant::now();
        self.sweep_if_due(now, window);

        let mut state = self.windows.entry(key.to_string()).or_insert(WindowState {
            count: 0,
            started: now,
            window,
        });

        if now.duration_since(state.started) >= state.window {
            state.count = 0;
            state.started = now;
        }
        state.window = window;
        state.count += 1;

        Hit {
            count: state.count,
            reset_in: window.saturating_sub(now.duration_since(state.started)),
        }
    }
}

impl RateLimitStore for MemoryStore {
    fn hit<'a>(&'a self, key: &'a str, window: Duration) -> BoxFuture<'a, Result<Hit, StoreError>> {
        let hit = self.record(key, window);
        Box::pin(std::future::ready(Ok(hit)))
    }

    fn reset<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        self.windows.remove(key);
        Box::pin(std::future::ready(Ok(())))
    }
}

/// Fixed-window rate limiter stage.
pub struct RateLimiter {
    config: RateLimiterConfig,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    /// Creates a limiter backed by a fresh [`MemoryStore`].
    pub fn new(config: RateLimiterConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Creates a limiter backed by the given store.
    pub fn with_store(config: RateLimiterConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self { config, store }
    }

    /// Returns the limiter settings.
    pub const fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Returns the backing store.
    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }

    fn rejection(&self, hit: Hit) -> Response {
        let mut response = match self.config.rejection_body() {
            Value::String(text) => Response::text(StatusCode::TOO_MANY_REQUESTS, &text),
            body => Response::json(StatusCode::TOO_MANY_REQUESTS, &body),
        };
        let retry_after = ceil_secs(hit.reset_in).max(1);
        response
            .headers_mut()
            .insert(headers::RETRY_AFTER, HeaderValue::from(retry_after));
        if self.config.standard_headers {
            self.add_headers(&mut response, hit);
        }
        response
    }

    fn add_headers(&self, response: &mut Response, hit: Hit) {
        let reset_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            + ceil_secs(hit.reset_in);

        let headers = response.headers_mut();
        headers.insert(headers::LIMIT, HeaderValue::from(self.config.max));
        headers.insert(
            headers::REMAINING,
            HeaderValue::from(self.config.max.saturating_sub(hit.count)),
        );
        headers.insert(headers::RESET, HeaderValue::from(reset_at));
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl Guard for RateLimiter {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn guard<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult<Response>> {
        Box::pin(async move {
            if self.config.skip.as_ref().is_some_and(|skip| skip(&request)) {
                return Ok(next.run(ctx, request).await);
            }
            let Some(key) = self.config.key_extractor.extract(&request, ctx) else {
                return Ok(next.run(ctx, request).await);
            };

            let hit = self
                .store
                .hit(&key, self.config.window)
                .await
                .map_err(PipelineError::unknown)?;

            if hit.count > self.config.max {
                tracing::debug!(
                    stage = self.name(),
                    request_id = %ctx.log_request_id(),
                    key = %key,
                    count = hit.count,
                    limit = self.config.max,
                    "Rate limit exceeded"
                );
                return Ok(self.rejection(hit));
            }

            let mut response = next.run(ctx, request).await;
            if self.config.standard_headers {
                self.add_headers(&mut response, hit);
            }
            Ok(response)
        })
    }
}

/// Builds a rate limiter stage backed by an in-memory store.
pub fn create_rate_limiter(config: RateLimiterConfig) -> Boundary<RateLimiter> {
    Boundary::new(RateLimiter::new(config))
}

/// Builds a rate limiter stage backed by `store`.
pub fn create_rate_limiter_with_store(
    config: RateLimiterConfig,
    store: Arc<dyn RateLimitStore>,
) -> Boundary<RateLimiter> {
    Boundary::new(RateLimiter::with_store(config, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use std::net::IpAddr;

    /// A request claiming to be forwarded for `spoofed`.
    fn request_from(spoofed: &str) -> Request {
        http::Request::builder()
            .uri("/api/items")
            .header("x-forwarded-for", spoofed)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn peer(ip: &str) -> MiddlewareContext {
        MiddlewareContext::with_client_addr(ip.parse::<IpAddr>().unwrap())
    }

    fn pipeline(config: RateLimiterConfig) -> Pipeline {
        Pipeline::builder().stage(create_rate_limiter(config)).build()
    }

    async fn send(pipeline: &Pipeline, request: Request) -> Response {
        send_as(pipeline, MiddlewareContext::new(), request).await
    }

    async fn send_as(pipeline: &Pipeline, ctx: MiddlewareContext, request: Request) -> Response {
        pipeline
            .process(ctx, request, |_ctx, _req| {
                Box::pin(async { Response::text(StatusCode::OK, "OK") })
            })
            .await
    }

    struct FailingStore;

    impl RateLimitStore for FailingStore {
        fn hit<'a>(&'a self, _key: &'a str, _window: Duration) -> BoxFuture<'a, Result<Hit, StoreError>> {
            Box::pin(async { Err(StoreError::Unavailable("connection refused".to_string())) })
        }

        fn reset<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(Duration::from_secs(15 * 60)), "15");
        assert_eq!(format_minutes(Duration::from_secs(30)), "0.5");
        assert_eq!(format_minutes(Duration::from_secs(90)), "1.5");
    }

    #[test]
    fn test_default_config() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.window, Duration::from_secs(900));
        assert_eq!(config.max, 100);
        assert!(config.standard_headers);
        assert!(matches!(config.key_extractor, KeyExtractor::Ip));
        assert!(matches!(
            config.trust_proxy(true).key_extractor,
            KeyExtractor::ForwardedIp
        ));
    }

    #[test]
    fn test_key_extractors() {
        let ctx = MiddlewareContext::with_client_addr("192.0.2.1".parse::<IpAddr>().unwrap());
        let forwarded = http::Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .header("x-api-key", "key-1")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let bare = http::Request::new(Full::new(Bytes::new()));

        assert_eq!(KeyExtractor::Ip.extract(&forwarded, &ctx).as_deref(), Some("192.0.2.1"));
        assert_eq!(KeyExtractor::Ip.extract(&bare, &ctx).as_deref(), Some("192.0.2.1"));
        assert_eq!(
            KeyExtractor::ForwardedIp.extract(&forwarded, &ctx).as_deref(),
            Some("203.0.113.9")
        );
        assert_eq!(KeyExtractor::ForwardedIp.extract(&bare, &ctx).as_deref(), Some("192.0.2.1"));
        assert_eq!(
            KeyExtractor::Ip.extract(&bare, &MiddlewareContext::new()).as_deref(),
            Some("unknown-ip")
        );
        assert_eq!(
            KeyExtractor::Header("x-api-key".to_string()).extract(&forwarded, &ctx).as_deref(),
            Some("key-1")
        );
        assert_eq!(KeyExtractor::Subject.extract(&forwarded, &ctx), None);
        assert_eq!(KeyExtractor::Global.extract(&bare, &ctx).as_deref(), Some("global"));
    }

    #[tokio::test]
    async fn test_memory_store_windows() {
        let store = MemoryStore::new();
        let window = Duration::from_millis(50);

        assert_eq!(store.hit("a", window).await.unwrap().count, 1);
        assert_eq!(store.hit("a", window).await.unwrap().count, 2);
        assert_eq!(store.hit("b", window).await.unwrap().count, 1);
        assert_eq!(store.len(), 2);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.hit("a", window).await.unwrap().count, 1);

        store.prune();
        assert_eq!(store.len(), 1);

        store.reset("a").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_after_max() {
        let pipeline = pipeline(RateLimiterConfig::default().max(2));

        // Rotating the forwarding header does not buy a fresh allowance.
        for (remaining, spoofed) in [("1", "1.1.1.1"), ("0", "2.2.2.2")] {
            let response = send_as(&pipeline, peer("198.51.100.1"), request_from(spoofed)).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[headers::LIMIT], "2");
            assert_eq!(response.headers()[headers::REMAINING], remaining);
            assert!(response.headers().contains_key(headers::RESET));
        }

        let response = send_as(&pipeline, peer("198.51.100.1"), request_from("3.3.3.3")).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[headers::REMAINING], "0");
        assert_eq!(response.headers()[headers::RETRY_AFTER], "900");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            json!({
                "error": "Too many requests, please try again after 15 minutes.",
                "status": 429
            })
        );

        let other_client = send_as(&pipeline, peer("198.51.100.2"), request_from("3.3.3.3")).await;
        assert_eq!(other_client.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_spoofed_forwarding_header_ignored_by_default() {
        let pipeline = pipeline(RateLimiterConfig::default().max(1));

        let mut statuses = Vec::new();
        for spoofed in ["1.1.1.1", "2.2.2.2", "3.3.3.3"] {
            let response = send_as(&pipeline, peer("192.0.2.50"), request_from(spoofed)).await;
            statuses.push(response.status().as_u16());
        }
        assert_eq!(statuses, [200, 429, 429]);
    }

    #[tokio::test]
    async fn test_trust_proxy_keys_on_forwarded_address() {
        let pipeline = pipeline(RateLimiterConfig::default().max(1).trust_proxy(true));

        for forwarded in ["1.1.1.1", "2.2.2.2"] {
            let response = send_as(&pipeline, peer("10.0.0.1"), request_from(forwarded)).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = send_as(&pipeline, peer("10.0.0.1"), request_from("1.1.1.1")).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_memory_store_sweeps_expired_windows() {
        let store = MemoryStore::new();
        let window = Duration::from_millis(100);

        for i in 0..1000 {
            store.hit(&format!("client-{i}"), window).await.unwrap();
        }
        assert_eq!(store.len(), 1000);

        tokio::time::sleep(Duration::from_millis(150)).await;
        store.hit("late", window).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_custom_text_message_without_headers() {
        let pipeline = pipeline(
            RateLimiterConfig::default()
                .max(0)
                .message("Slow down")
                .standard_headers(false),
        );

        let response = send(&pipeline, request_from("198.51.100.3")).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(!response.headers().contains_key(headers::LIMIT));
        assert!(response.headers().contains_key(headers::RETRY_AFTER));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Slow down");
    }

    #[tokio::test]
    async fn test_skip_predicate() {
        let pipeline = pipeline(
            RateLimiterConfig::default()
                .max(0)
                .skip(|request| request.uri().path() == "/health"),
        );

        let health = http::Request::builder()
            .uri("/health")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = send(&pipeline, health).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(headers::LIMIT));
    }

    #[tokio::test]
    async fn test_requests_without_key_are_not_counted() {
        let pipeline = pipeline(RateLimiterConfig::default().max(0).per_header("X-Api-Key"));
        let response = send(&pipeline, request_from("198.51.100.4")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error() {
        let pipeline = Pipeline::builder()
            .stage(create_rate_limiter_with_store(
                RateLimiterConfig::default(),
                Arc::new(FailingStore),
            ))
            .build();

        let response = send(&pipeline, request_from("198.51.100.5")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_debug_hides_closures() {
        let config = RateLimiterConfig::default().key_extractor(|_| None).skip(|_| false);
        let debug = format!("{config:?}");
        assert!(debug.contains("KeyExtractor::Custom(<fn>)"));
        assert!(debug.contains("skip: true"));
    }
}
