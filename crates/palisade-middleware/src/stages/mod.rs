//! Pipeline stages.
//!
//! Stages run in the order given to the [`PipelineBuilder`](crate::PipelineBuilder).
//! The usual order is:
//!
//! 1. [`request_id`] - Stamp a random correlation ID on the response
//! 2. [`rate_limit`] - Fixed-window request counting
//! 3. [`auth_guard`] - Verify the credential and attach claims
//! 4. [`authorize`] - Compare a role claim against allowed roles
//! 5. [`validation`] - Validate body, query or headers against a schema
//!
//! Every stage except the correlator is a [`Guard`](crate::Guard) wrapped in a
//! [`Boundary`](crate::Boundary), so failures become JSON error responses.

pub mod auth_guard;
pub mod authorize;
pub mod rate_limit;
pub mod request_id;
pub mod validation;

// Re-export main types
pub use auth_guard::AuthGuard;
pub use authorize::{RoleAuthorizer, DEFAULT_ROLE_CLAIM};
pub use rate_limit::{
    create_rate_limiter, create_rate_limiter_with_store, Hit, KeyExtractor, MemoryStore, RateLimitStore,
    RateLimiter, RateLimiterConfig, StoreError,
};
pub use request_id::{RequestIdMiddleware, REQUEST_ID_HEADER};
pub use validation::{RequestSource, RequestValidator, ValidatedFragment};
