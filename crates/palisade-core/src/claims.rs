//! Identity claims attached by credential verification.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded claims of a verified credential.
///
/// Claims are an open JSON object. Registered claims (`sub`, `exp`, `iat`,
/// `nbf`) have typed accessors; anything else is reachable through
/// [`IdentityClaims::get`].
///
/// # Example
///
/// ```
/// use palisade_core::IdentityClaims;
/// use serde_json::json;
///
/// let claims = IdentityClaims::from_value(json!({"sub": "u1", "role": "admin"})).unwrap();
/// assert_eq!(claims.subject(), Some("u1"));
/// assert_eq!(claims.get_str("role"), Some("admin"));
/// assert_eq!(claims.log_id(), "sub:u1");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityClaims(Map<String, Value>);

impl IdentityClaims {
    /// Creates claims from a JSON object.
    #[must_use]
    pub const fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Creates claims from any JSON value. Returns `None` unless it is an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(claims) => Some(Self(claims)),
            _ => None,
        }
    }

    /// Returns a claim by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns a string claim by name.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// The `sub` claim.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.get_str("sub")
    }

    /// The `exp` claim, in seconds since the Unix epoch.
    #[must_use]
    pub fn expires_at(&self) -> Option<u64> {
        self.get("exp").and_then(Value::as_u64)
    }

    /// The `iat` claim, in seconds since the Unix epoch.
    #[must_use]
    pub fn issued_at(&self) -> Option<u64> {
        self.get("iat").and_then(Value::as_u64)
    }

    /// Returns `true` if no claims are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the underlying object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the claims, returning the underlying object.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Returns an identifier suitable for logs.
    ///
    /// Never includes anything beyond the subject.
    #[must_use]
    pub fn log_id(&self) -> String {
        match self.subject() {
            Some(sub) => format!("sub:{sub}"),
            None => "sub:unknown".to_string(),
        }
    }
}

impl From<Map<String, Value>> for IdentityClaims {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(IdentityClaims::from_value(json!("token")).is_none());
        assert!(IdentityClaims::from_value(json!(null)).is_none());
        assert!(IdentityClaims::from_value(json!({})).is_some_and(|c| c.is_empty()));
    }

    #[test]
    fn test_registered_claims() {
        let claims =
            IdentityClaims::from_value(json!({"sub": "u1", "iat": 1_700_000_000, "exp": 1_700_003_600}))
                .unwrap();
        assert_eq!(claims.subject(), Some("u1"));
        assert_eq!(claims.issued_at(), Some(1_700_000_000));
        assert_eq!(claims.expires_at(), Some(1_700_003_600));
    }

    #[test]
    fn test_log_id_without_subject() {
        let claims = IdentityClaims::from_value(json!({"role": "admin"})).unwrap();
        assert_eq!(claims.log_id(), "sub:unknown");
    }

    #[test]
    fn test_serializes_transparently() {
        let claims = IdentityClaims::from_value(json!({"sub": "u1"})).unwrap();
        assert_eq!(serde_json::to_value(&claims).unwrap(), json!({"sub": "u1"}));
    }
}
