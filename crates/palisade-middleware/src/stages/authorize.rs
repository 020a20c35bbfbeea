//! Role-based authorization.
//!
//! Compares one claim of the verified credential (default `role`) against
//! a list of allowed roles. The claim may hold a single role or an array of
//! roles; any match is enough. Requests without claims, without the claim
//! or with no matching role are answered with `403 Forbidden`.
//!
//! Must run after the [`AuthGuard`](super::AuthGuard).

use crate::boundary::{Boundary, Guard};
use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Next};
use crate::types::{Request, Response};
use palisade_core::{AppError, IdentityClaims, PipelineResult};
use palisade_telemetry::log_stage_passed;
use serde_json::Value;

/// Claim checked when none is configured.
pub const DEFAULT_ROLE_CLAIM: &str = "role";

/// Allows requests whose role claim matches one of the configured roles.
///
/// # Example
///
/// ```
/// use palisade_core::IdentityClaims;
/// use palisade_middleware::stages::RoleAuthorizer;
/// use serde_json::json;
///
/// let admins = RoleAuthorizer::new(["admin", "owner"]);
/// let claims = IdentityClaims::from_value(json!({"role": ["editor", "owner"]})).unwrap();
/// assert!(admins.is_allowed(&claims));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAuthorizer {
    roles: Vec<String>,
    claim: String,
}

impl RoleAuthorizer {
    /// Creates an authorizer allowing the given roles.
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            claim: DEFAULT_ROLE_CLAIM.to_string(),
        }
    }

    /// Sets the claim holding the caller's role.
    pub fn claim(mut self, name: impl Into<String>) -> Self {
        self.claim = name.into();
        self
    }

    /// Returns the allowed roles.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Returns `true` if the claims carry an allowed role.
    pub fn is_allowed(&self, claims: &IdentityClaims) -> bool {
        match claims.get(&self.claim) {
            Some(Value::String(role)) => self.allows(role),
            Some(Value::Array(roles)) => roles.iter().filter_map(Value::as_str).any(|role| self.allows(role)),
            _ => false,
        }
    }

    fn allows(&self, role: &str) -> bool {
        self.roles.iter().any(|allowed| allowed == role)
    }

    /// Wraps the authorizer in a [`Boundary`] with the default formatter.
    pub fn into_middleware(self) -> Boundary<Self> {
        Boundary::new(self)
    }
}

impl Guard for RoleAuthorizer {
    fn name(&self) -> &'static str {
        "authorize"
    }

    fn guard<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, PipelineResult<Response>> {
        Box::pin(async move {
            let allowed = ctx.claims().is_some_and(|claims| self.is_allowed(claims));
            if !allowed {
                tracing::debug!(
                    request_id = %ctx.log_request_id(),
                    subject = %ctx.claims().map_or_else(|| "anonymous".to_string(), |c| c.log_id()),
                    claim = %self.claim,
                    required = ?self.roles,
                    "Role not allowed"
                );
                return Err(AppError::forbidden().into());
            }
            log_stage_passed!(self.name(), ctx.log_request_id());
            Ok(next.run(ctx, request).await)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Middleware;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::{BodyExt, Full};
    use serde_json::json;
    use std::sync::Arc;

    fn claims(value: Value) -> IdentityClaims {
        IdentityClaims::from_value(value).unwrap()
    }

    async fn run(authorizer: RoleAuthorizer, claims: Option<IdentityClaims>) -> Response {
        let middleware = authorizer.into_middleware();
        let mut ctx = MiddlewareContext::new();
        if let Some(claims) = claims {
            ctx.attach_claims(Arc::new(claims));
        }
        let request = http::Request::new(Full::new(Bytes::new()));
        let next = Next::handler(|_ctx, _req| Box::pin(async { Response::text(StatusCode::OK, "OK") }));
        middleware.process(&mut ctx, request, next).await
    }

    #[test]
    fn test_is_allowed() {
        let authorizer = RoleAuthorizer::new(["admin"]);
        assert!(authorizer.is_allowed(&claims(json!({"role": "admin"}))));
        assert!(!authorizer.is_allowed(&claims(json!({"role": "editor"}))));
        assert!(authorizer.is_allowed(&claims(json!({"role": ["viewer", "admin"]}))));
        assert!(!authorizer.is_allowed(&claims(json!({"role": 1}))));
        assert!(!authorizer.is_allowed(&claims(json!({"sub": "x"}))));
    }

    #[test]
    fn test_role_match_is_case_sensitive() {
        let authorizer = RoleAuthorizer::new(["admin"]);
        assert!(!authorizer.is_allowed(&claims(json!({"role": "Admin"}))));
    }

    #[test]
    fn test_empty_roles_allow_nobody() {
        let authorizer = RoleAuthorizer::new(Vec::<String>::new());
        assert!(!authorizer.is_allowed(&claims(json!({"role": "admin"}))));
    }

    #[test]
    fn test_custom_claim() {
        let authorizer = RoleAuthorizer::new(["gold"]).claim("tier");
        assert!(authorizer.is_allowed(&claims(json!({"tier": "gold", "role": "user"}))));
        assert_eq!(authorizer.roles(), ["gold".to_string()]);
    }

    #[tokio::test]
    async fn test_allowed_role_passes() {
        let response = run(RoleAuthorizer::new(["admin"]), Some(claims(json!({"role": "admin"})))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_other_role_is_forbidden() {
        let response = run(RoleAuthorizer::new(["admin"]), Some(claims(json!({"role": "editor"})))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({"status": 403, "message": "Forbidden"}));
    }

    #[tokio::test]
    async fn test_missing_claims_are_forbidden() {
        let response = run(RoleAuthorizer::new(["admin"]), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
