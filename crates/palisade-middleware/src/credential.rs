//! Credential extraction, verification and signing.
//!
//! A credential travels either in a cookie (checked first) or in an
//! `Authorization: Bearer <token>` header. Tokens are HS256 JWTs signed with
//! the configured secret.
//!
//! # Example
//!
//! ```
//! use palisade_middleware::credential::{JwtSigner, JwtVerifier};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let signer = JwtSigner::new("s3cret", Duration::from_secs(3600));
//! let token = signer.sign(&json!({"sub": "42", "role": "admin"})).unwrap();
//!
//! let claims = JwtVerifier::new("s3cret").verify_token(&token).unwrap();
//! assert_eq!(claims.subject(), Some("42"));
//! assert!(claims.expires_at().is_some());
//! ```

use crate::cookie::Cookies;
use crate::middleware::BoxFuture;
use crate::schema::type_name;
use http::header::AUTHORIZATION;
use http::HeaderMap;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use palisade_config::EnvConfig;
use palisade_core::{AppError, CredentialError, IdentityClaims, PipelineError, PipelineResult};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default name of the credential cookie.
pub const DEFAULT_COOKIE_NAME: &str = "token";

/// Verifies a raw credential and yields its claims.
///
/// Implement this to plug in a different token format or a remote
/// introspection endpoint.
pub trait CredentialVerifier: Send + Sync + 'static {
    /// Verifies the token.
    fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<IdentityClaims, CredentialError>>;
}

impl<V: CredentialVerifier + ?Sized> CredentialVerifier for Arc<V> {
    fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<IdentityClaims, CredentialError>> {
        (**self).verify(token)
    }
}

/// HS256 JWT verifier.
///
/// Checks the signature and, when present, the `exp` and `nbf` claims.
/// Neither is required, and the audience is not checked.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Creates a verifier for the given secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    /// Creates a verifier using the configured secret.
    pub fn from_config(config: &EnvConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes())
    }

    /// Tolerates clock skew of up to `leeway` when checking `exp` and `nbf`.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.validation.leeway = leeway.as_secs();
        self
    }

    /// Verifies a token synchronously.
    pub fn verify_token(&self, token: &str) -> Result<IdentityClaims, CredentialError> {
        jsonwebtoken::decode::<Map<String, Value>>(token, &self.key, &self.validation)
            .map(|data| IdentityClaims::new(data.claims))
            .map_err(|error| match error.kind() {
                JwtErrorKind::ExpiredSignature => CredentialError::Expired,
                JwtErrorKind::ImmatureSignature => CredentialError::NotYetValid,
                _ => CredentialError::malformed(error.to_string()),
            })
    }
}

impl fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithm", &Algorithm::HS256)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

impl CredentialVerifier for JwtVerifier {
    fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<IdentityClaims, CredentialError>> {
        let result = self.verify_token(token);
        Box::pin(std::future::ready(result))
    }
}

/// Errors raised while issuing a credential.
#[derive(Debug, Error)]
pub enum SignError {
    /// Only JSON objects can carry registered claims.
    #[error("credential payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// The payload sets `exp` while the signer also assigns a lifetime.
    #[error("payload already has an \"exp\" claim")]
    ExpiryConflict,

    /// The token could not be encoded.
    #[error("failed to encode credential: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    /// The cookie could not be turned into a header value.
    #[error("invalid Set-Cookie header: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
}

impl From<SignError> for PipelineError {
    fn from(error: SignError) -> Self {
        PipelineError::unknown(error)
    }
}

/// HS256 JWT signer.
#[derive(Clone)]
pub struct JwtSigner {
    key: EncodingKey,
    expires_in: Duration,
}

impl JwtSigner {
    /// Creates a signer issuing tokens valid for `expires_in`.
    pub fn new(secret: impl AsRef<[u8]>, expires_in: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_ref()),
            expires_in,
        }
    }

    /// Creates a signer using the configured secret and lifetime.
    pub fn from_config(config: &EnvConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes(), config.jwt_expiration)
    }

    /// Returns the lifetime of issued tokens.
    pub const fn expires_in(&self) -> Duration {
        self.expires_in
    }

    /// Signs a payload.
    ///
    /// Adds `iat` (unless the payload sets it) and `exp = iat + lifetime`.
    pub fn sign(&self, payload: &Value) -> Result<String, SignError> {
        let Value::Object(claims) = payload else {
            return Err(SignError::NotAnObject(type_name(payload)));
        };
        if claims.contains_key("exp") {
            return Err(SignError::ExpiryConflict);
        }

        let mut claims = claims.clone();
        let issued_at = match claims.get("iat").and_then(Value::as_u64) {
            Some(iat) => iat,
            None => {
                let now = jsonwebtoken::get_current_timestamp();
                claims.insert("iat".to_string(), Value::from(now));
                now
            }
        };
        claims.insert(
            "exp".to_string(),
            Value::from(issued_at.saturating_add(self.expires_in.as_secs())),
        );

        Ok(jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)?)
    }
}

impl fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSigner")
            .field("algorithm", &Algorithm::HS256)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Returns the token of an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.to_string())
}

/// Finds the raw credential of a request.
///
/// A non-empty cookie named `cookie_name` wins over the `Authorization`
/// header.
pub fn extract_credential(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    Cookies::from_headers(headers)
        .get(cookie_name)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| bearer_token(headers))
}

/// Authentication progress of a single request.
#[derive(Debug, Clone)]
pub enum AuthState {
    /// No credential was presented.
    NoCredential,
    /// A credential was found but not checked yet.
    Unverified(String),
    /// The credential was verified.
    Verified(Arc<IdentityClaims>),
}

impl AuthState {
    /// Inspects the request headers for a credential.
    pub fn extract(headers: &HeaderMap, cookie_name: &str) -> Self {
        extract_credential(headers, cookie_name).map_or(Self::NoCredential, Self::Unverified)
    }

    /// Returns `true` once the credential has been verified.
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }

    /// Moves to [`AuthState::Verified`] or fails.
    ///
    /// A missing credential and a credential without claims are both
    /// reported as a plain `401`; verification failures keep their
    /// [`CredentialError`] for the logs.
    pub async fn verify<V>(self, verifier: &V) -> PipelineResult<Arc<IdentityClaims>>
    where
        V: CredentialVerifier + ?Sized,
    {
        match self {
            Self::NoCredential => Err(AppError::unauthorized().into()),
            Self::Unverified(token) => {
                let claims = verifier.verify(&token).await?;
                if claims.is_empty() {
                    return Err(AppError::unauthorized().into());
                }
                Ok(Arc::new(claims))
            }
            Self::Verified(claims) => Ok(claims),
        }
    }
}
