//! Middleware context types.
//!
//! The [`MiddlewareContext`] carries per-request state through the pipeline:
//! the request identifier, the verified claims, the peer address and any
//! typed extension a stage wants to hand to later stages or the handler.

use palisade_core::IdentityClaims;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Placeholder logged when no request identifier has been assigned.
const NO_REQUEST_ID: &str = "-";

/// Context that flows through the middleware pipeline.
///
/// Created by the host for each request and dropped when the response has
/// been produced. Stages enrich it as the request moves down the chain.
///
/// # Example
///
/// ```
/// use palisade_middleware::MiddlewareContext;
/// use palisade_core::IdentityClaims;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let mut ctx = MiddlewareContext::new();
/// let claims = IdentityClaims::from_value(json!({"sub": "42", "role": "admin"})).unwrap();
///
/// assert!(ctx.attach_claims(Arc::new(claims)));
/// assert_eq!(ctx.claims().and_then(|c| c.subject()), Some("42"));
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    /// Identifier assigned by the request-id stage.
    request_id: Option<String>,

    /// Claims of the verified credential, attached at most once.
    claims: Option<Arc<IdentityClaims>>,

    /// Address of the connected peer, when the host knows it.
    client_addr: Option<IpAddr>,

    /// When the request started processing.
    started_at: Instant,

    /// Type-erased extension data.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: None,
            claims: None,
            client_addr: None,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Creates a context for a request from the given peer.
    #[must_use]
    pub fn with_client_addr(client_addr: IpAddr) -> Self {
        Self {
            client_addr: Some(client_addr),
            ..Self::new()
        }
    }

    /// Returns the request ID, if one has been assigned.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns the request ID for log fields, or `-` if none was assigned.
    #[must_use]
    pub fn log_request_id(&self) -> &str {
        self.request_id.as_deref().unwrap_or(NO_REQUEST_ID)
    }

    /// Sets the request ID.
    pub fn set_request_id(&mut self, request_id: impl Into<String>) {
        self.request_id = Some(request_id.into());
    }

    /// Returns the verified claims, if any.
    #[must_use]
    pub fn claims(&self) -> Option<&Arc<IdentityClaims>> {
        self.claims.as_ref()
    }

    /// Returns `true` once claims have been attached.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.claims.is_some()
    }

    /// Attaches verified claims.
    ///
    /// Claims can only be attached once. Returns `false` and keeps the
    /// existing claims if some were already attached.
    pub fn attach_claims(&mut self, claims: Arc<IdentityClaims>) -> bool {
        if self.claims.is_some() {
            return false;
        }
        self.claims = Some(claims);
        true
    }

    /// Returns the peer address.
    #[must_use]
    pub fn client_addr(&self) -> Option<IpAddr> {
        self.client_addr
    }

    /// Sets the peer address.
    pub fn set_client_addr(&mut self, client_addr: IpAddr) {
        self.client_addr = Some(client_addr);
    }

    /// Returns when the request started processing.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores an extension value, replacing any previous value of that type.
    pub fn set_extension<T: Any + Send + Sync>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Gets an extension value by type.
    #[must_use]
    pub fn get_extension<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Removes an extension value by type.
    pub fn remove_extension<T: Any + Send + Sync>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast().ok())
            .map(|boxed| *boxed)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Any + Send + Sync>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(subject: &str) -> Arc<IdentityClaims> {
        Arc::new(IdentityClaims::from_value(json!({ "sub": subject })).unwrap())
    }

    #[test]
    fn test_new_context() {
        let ctx = MiddlewareContext::new();
        assert_eq!(ctx.request_id(), None);
        assert_eq!(ctx.log_request_id(), "-");
        assert!(!ctx.is_authenticated());
        assert!(ctx.client_addr().is_none());
    }

    #[test]
    fn test_request_id() {
        let mut ctx = MiddlewareContext::new();
        ctx.set_request_id("abc123");
        assert_eq!(ctx.request_id(), Some("abc123"));
        assert_eq!(ctx.log_request_id(), "abc123");
    }

    #[test]
    fn test_claims_attached_once() {
        let mut ctx = MiddlewareContext::new();
        assert!(ctx.attach_claims(claims("first")));
        assert!(!ctx.attach_claims(claims("second")));
        assert_eq!(ctx.claims().and_then(|c| c.subject()), Some("first"));
    }

    #[test]
    fn test_client_addr() {
        let addr: IpAddr = "10.0.0.7".parse().unwrap();
        let ctx = MiddlewareContext::with_client_addr(addr);
        assert_eq!(ctx.client_addr(), Some(addr));
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, PartialEq)]
        struct Tenant(String);

        let mut ctx = MiddlewareContext::new();
        assert!(!ctx.has_extension::<Tenant>());

        ctx.set_extension(Tenant("acme".to_string()));
        assert!(ctx.has_extension::<Tenant>());
        assert_eq!(ctx.get_extension::<Tenant>().unwrap().0, "acme");

        let removed = ctx.remove_extension::<Tenant>();
        assert_eq!(removed, Some(Tenant("acme".to_string())));
        assert!(!ctx.has_extension::<Tenant>());
    }

    #[test]
    fn test_elapsed() {
        let ctx = MiddlewareContext::new();
        std::thread::sleep(Duration::from_millis(5));
        assert!(ctx.elapsed() >= Duration::from_millis(5));
        assert!(ctx.started_at() <= Instant::now());
    }
}
