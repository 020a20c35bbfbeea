//! # Palisade
//!
//! **Authentication and request pipeline toolkit for HTTP services**
//!
//! Palisade provides the stages that sit between an HTTP server and its
//! handlers:
//!
//! - **Credential verification** – HS256 tokens from a cookie or `Authorization: Bearer`
//! - **Role authorization** – allow-lists checked against a claim
//! - **Schema validation** – body, query or headers, with coercion and issue maps
//! - **Request correlation** – random hex `X-Request-ID` on every response
//! - **Rate limiting** – fixed windows per client address, header or subject
//! - **Uniform errors** – every failure rendered as `{status, message, ...}`
//!
//! ## Quick Start
//!
//! ```
//! use palisade::prelude::*;
//! use palisade::Toolkit;
//! use bytes::Bytes;
//! use http_body_util::Full;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let toolkit = Toolkit::new(EnvConfig::default());
//!
//! let admin_only = Pipeline::builder()
//!     .stage(toolkit.request_id())
//!     .stage(toolkit.auth_guard())
//!     .stage(toolkit.authorize(["admin"]))
//!     .build();
//!
//! let request: Request = http::Request::new(Full::new(Bytes::new()));
//! let response = admin_only
//!     .process(MiddlewareContext::new(), request, |_ctx, _req| {
//!         Box::pin(async { send_response(json!({"message": "Welcome"})) })
//!     })
//!     .await;
//! assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → RequestId → RateLimit → AuthGuard → Authorize → Validate → Handler
//!                                                                        ↓
//! Response ←─────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod toolkit;

pub use toolkit::Toolkit;

// Re-export core types
pub use palisade_core as core;

// Re-export configuration types
pub use palisade_config as config;

// Re-export telemetry types
pub use palisade_telemetry as telemetry;

// Re-export middleware types
pub use palisade_middleware as middleware;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use palisade::prelude::*;
/// ```
pub mod prelude {
    pub use palisade_core::{
        AppError, CredentialError, DefaultErrorFormatter, ErrorFormatter, IdentityClaims, NormalizedError,
        PipelineError, PipelineResult, ValidationError, ValidationIssue,
    };

    pub use palisade_config::{ConfigError, ConfigLoader, EnvConfig, Environment};

    pub use palisade_telemetry::{init_logging, LogConfig};

    // Pipeline plumbing
    pub use palisade_middleware::{
        catch, catch_with, guard_fn, Boundary, BoxFuture, Guard, Middleware, MiddlewareContext, Next, Pipeline,
        PipelineBuilder, Request, Response, ResponseExt,
    };

    // Stages
    pub use palisade_middleware::stages::{
        AuthGuard, KeyExtractor, RateLimiterConfig, RequestIdMiddleware, RequestSource, RequestValidator,
        RoleAuthorizer, ValidatedFragment,
    };

    // Credentials, cookies and responses
    pub use palisade_middleware::schema::rules;
    pub use palisade_middleware::{
        send_response, sign_cookie, CookieOverrides, JwtSigner, JwtVerifier, Schema, SignCookieOptions,
        SuccessResponse,
    };
}
