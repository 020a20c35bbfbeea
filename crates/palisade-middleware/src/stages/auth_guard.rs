//! Authentication guard.
//!
//! Finds the request credential (cookie first, then `Authorization: Bearer`),
//! verifies it and attaches the decoded claims to the context. Requests
//! without a valid credential are answered with `401 Unauthorized` and never
//! reach later stages.
//!
//! # Pipeline Position
//!
//! ```text
//! Request → RequestId → RateLimit → [AuthGuard] → Authorize → Validate → Handler
//! ```

use crate::boundary::{Boundary, Guard};
use crate::context::MiddlewareContext;
use crate::credential::{AuthState, CredentialVerifier, JwtVerifier, DEFAULT_COOKIE_NAME};
use crate::middleware::{BoxFuture, Next};
use crate::types::{Request, Response};
use palisade_config::EnvConfig;
use palisade_core::PipelineResult;

/// Verifies the request credential and attaches its claims.
///
/// # Example
///
/// ```
/// use palisade_config::EnvConfig;
/// use palisade_middleware::stages::AuthGuard;
///
/// let guard = AuthGuard::from_config(&EnvConfig::default())
///     .cookie_name("session")
///     .into_middleware();
/// ```
#[derive(Debug, Clone)]
pub struct AuthGuard<V = JwtVerifier> {
    verifier: V,
    cookie_name: String,
}

impl AuthGuard<JwtVerifier> {
    /// Creates a guard verifying HS256 tokens signed with `JWT_SECRET`.
    pub fn from_config(config: &EnvConfig) -> Self {
        Self::new(JwtVerifier::from_config(config))
    }
}

impl<V: CredentialVerifier> AuthGuard<V> {
    /// Creates a guard using the given verifier.
    pub fn new(verifier: V) -> Self {
        Self {
            verifier,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
        }
    }

    /// Sets the name of the credential cookie. Defaults to `token`.
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Wraps the guard in a [`Boundary`] with the default formatter.
    pub fn into_middleware(self) -> Boundary<Self> {
        Boundary::new(self)
    }
}

impl<V: CredentialVerifier> Guard for AuthGuard<V> {
    fn name(&self) -> &'static str {
        "auth_guard"
    }

    fn guard<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult<Response>> {
        Box::pin(async move {
            let state = AuthState::extract(request.headers(), &self.cookie_name);
            if matches!(state, AuthState::NoCredential) {
                tracing::debug!(
                    request_id = %ctx.log_request_id(),
                    path = %request.uri().path(),
                    "No credential presented"
                );
            }

            let claims = state.verify(&self.verifier).await?;
            tracing::debug!(
                request_id = %ctx.log_request_id(),
                subject = %claims.log_id(),
                "Credential verified"
            );

            if !ctx.attach_claims(claims) {
                tracing::warn!(
                    request_id = %ctx.log_request_id(),
                    "Claims already attached; keeping the first verified credential"
                );
            }
            Ok(next.run(ctx, request).await)
        })
    }
}
