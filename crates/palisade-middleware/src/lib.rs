//! # Palisade Middleware
//!
//! Request pipeline stages for HTTP services: credential verification,
//! role authorization, schema validation, request correlation and rate
//! limiting, plus the response helpers that go with them.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Request → RequestId → RateLimit → AuthGuard → Authorize → Validate → Handler
//!                                                                        ↓
//! Response ←─────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Stage | Type | Rejects with |
//! |-------|------|--------------|
//! | Request ID | [`stages::RequestIdMiddleware`] | never |
//! | Rate limit | [`stages::RateLimiter`] | 429 |
//! | Auth guard | [`stages::AuthGuard`] | 401 |
//! | Authorize | [`stages::RoleAuthorizer`] | 403 |
//! | Validate | [`stages::RequestValidator`] | 400 |
//!
//! Fallible stages are [`Guard`]s wrapped in a [`Boundary`], which renders
//! any [`PipelineError`](palisade_core::PipelineError) as
//! `{"status": ..., "message": ...}` JSON. Handlers can use [`catch`] for the
//! same rendering and [`send_response`] for the success envelope.
//!
//! ## Example
//!
//! ```
//! use palisade_config::EnvConfig;
//! use palisade_middleware::stages::{AuthGuard, RequestIdMiddleware, RoleAuthorizer};
//! use palisade_middleware::{send_response, MiddlewareContext, Pipeline, Request};
//! use bytes::Bytes;
//! use http::StatusCode;
//! use http_body_util::Full;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let config = EnvConfig::default();
//! let pipeline = Pipeline::builder()
//!     .stage(RequestIdMiddleware::new())
//!     .stage(AuthGuard::from_config(&config).into_middleware())
//!     .stage(RoleAuthorizer::new(["admin"]).into_middleware())
//!     .build();
//!
//! let request: Request = http::Request::new(Full::new(Bytes::new()));
//! let response = pipeline
//!     .process(MiddlewareContext::new(), request, |_ctx, _req| {
//!         Box::pin(async { send_response(json!({"message": "Welcome"})) })
//!     })
//!     .await;
//!
//! // No credential was presented.
//! assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
//! assert!(response.headers().contains_key("x-request-id"));
//! # });
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod context;
pub mod cookie;
pub mod credential;
pub mod middleware;
pub mod pipeline;
pub mod response;
pub mod schema;
pub mod stages;
pub mod types;

// Re-export main types at crate root
pub use boundary::{catch, catch_with, guard_fn, Boundary, FnGuard, Guard};
pub use context::MiddlewareContext;
pub use cookie::{sign_cookie, CookieOptions, CookieOverrides, Cookies, SameSite, SetCookie, SignCookieOptions};
pub use credential::{AuthState, CredentialVerifier, JwtSigner, JwtVerifier, SignError};
pub use middleware::{BoxFuture, Middleware, Next};
pub use pipeline::{BoxedMiddleware, Pipeline, PipelineBuilder};
pub use response::{send_response, SuccessResponse};
pub use schema::{ObjectSchema, Rule, Schema};
pub use types::{Request, Response, ResponseExt};
