//! Cookie parsing and credential cookies.
//!
//! [`Cookies`] reads the `Cookie` request header, [`SetCookie`] renders a
//! `Set-Cookie` header, and [`sign_cookie`] issues a signed credential and
//! stores it in a cookie on the response.
//!
//! # Example
//!
//! ```
//! use palisade_config::{EnvConfig, Environment};
//! use palisade_middleware::cookie::{sign_cookie, SignCookieOptions};
//! use palisade_middleware::{Response, ResponseExt};
//! use http::StatusCode;
//! use serde_json::json;
//!
//! let config = EnvConfig {
//!     environment: Environment::Production,
//!     jwt_secret: "s3cret".to_string(),
//!     ..EnvConfig::default()
//! };
//!
//! let mut response = Response::json(StatusCode::OK, &json!({}));
//! let token = sign_cookie(&mut response, &json!({"sub": "42"}), &SignCookieOptions::default(), &config).unwrap();
//!
//! let header = response.headers()["set-cookie"].to_str().unwrap();
//! assert!(header.starts_with(&format!("token={token}")));
//! assert!(header.contains("HttpOnly"));
//! assert!(header.contains("Secure"));
//! assert!(header.contains("SameSite=Lax"));
//! assert!(header.contains("Max-Age=86400"));
//! ```

use crate::credential::{JwtSigner, SignError, DEFAULT_COOKIE_NAME};
use crate::types::Response;
use http::header::{self, HeaderValue};
use http::HeaderMap;
use palisade_config::EnvConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Cookies sent with a request.
///
/// When a name appears more than once, the first value wins.
#[derive(Debug, Clone, Default)]
pub struct Cookies {
    cookies: HashMap<String, String>,
}

impl Cookies {
    /// Create an empty Cookies instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every `Cookie` header. Values that are not valid UTF-8 are skipped.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = Self::new();
        for value in headers.get_all(header::COOKIE) {
            if let Ok(value) = value.to_str() {
                cookies.extend_from(value);
            }
        }
        cookies
    }

    /// Parses a single `Cookie` header value.
    #[must_use]
    pub fn parse(header_value: &str) -> Self {
        let mut cookies = Self::new();
        cookies.extend_from(header_value);
        cookies
    }

    fn extend_from(&mut self, header_value: &str) {
        for pair in header_value.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                let value = value.trim().trim_matches('"');
                self.cookies
                    .entry(name.to_string())
                    .or_insert_with(|| value.to_string());
            }
        }
    }

    /// Get a cookie value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Check if a cookie exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    /// Get the number of cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Check if there are no cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    /// Cookie is sent with cross-site requests.
    None,
    /// Cookie is sent with same-site and cross-site top-level navigations.
    #[default]
    Lax,
    /// Cookie is only sent with same-site requests.
    Strict,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Lax => write!(f, "Lax"),
            Self::Strict => write!(f, "Strict"),
        }
    }
}

/// Builder for a `Set-Cookie` header.
///
/// ```
/// use palisade_middleware::cookie::{SameSite, SetCookie};
///
/// let header = SetCookie::new("session", "abc123")
///     .http_only(true)
///     .same_site(SameSite::Strict)
///     .max_age_secs(3600)
///     .path("/")
///     .to_header_value();
///
/// assert_eq!(header, "session=abc123; Path=/; Max-Age=3600; HttpOnly; SameSite=Strict");
/// ```
#[derive(Debug, Clone)]
pub struct SetCookie {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    max_age: Option<Duration>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl SetCookie {
    /// Create a new Set-Cookie builder.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    /// Creates a cookie with every attribute taken from `options`.
    #[must_use]
    pub fn with_options(name: impl Into<String>, value: impl Into<String>, options: &CookieOptions) -> Self {
        Self {
            domain: options.domain.clone(),
            path: options.path.clone(),
            max_age: options.max_age,
            secure: options.secure,
            http_only: options.http_only,
            same_site: Some(options.same_site),
            ..Self::new(name, value)
        }
    }

    /// Set the Domain attribute.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the Path attribute.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the Max-Age attribute.
    #[must_use]
    pub fn max_age(mut self, duration: Duration) -> Self {
        self.max_age = Some(duration);
        self
    }

    /// Set the Max-Age attribute in seconds.
    #[must_use]
    pub fn max_age_secs(self, seconds: u64) -> Self {
        self.max_age(Duration::from_secs(seconds))
    }

    /// Set the Secure attribute.
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the `HttpOnly` attribute.
    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set the `SameSite` attribute.
    #[must_use]
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Get the cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the cookie value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Convert to Set-Cookie header value.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        let mut parts = vec![format!("{}={}", self.name, self.value)];

        if let Some(ref domain) = self.domain {
            parts.push(format!("Domain={domain}"));
        }
        if let Some(ref path) = self.path {
            parts.push(format!("Path={path}"));
        }
        if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={}", max_age.as_secs()));
        }
        if self.secure {
            parts.push("Secure".to_string());
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        if let Some(same_site) = self.same_site {
            parts.push(format!("SameSite={same_site}"));
        }

        parts.join("; ")
    }

    /// Appends this cookie to the response headers.
    pub fn append_to(&self, response: &mut Response) -> Result<(), header::InvalidHeaderValue> {
        let value = HeaderValue::from_str(&self.to_header_value())?;
        response.headers_mut().append(header::SET_COOKIE, value);
        Ok(())
    }
}

/// Attributes of the credential cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    /// Hide the cookie from scripts.
    pub http_only: bool,
    /// Only send the cookie over HTTPS.
    pub secure: bool,
    /// Cross-site policy.
    pub same_site: SameSite,
    /// Lifetime. `None` makes a session cookie.
    pub max_age: Option<Duration>,
    /// Path scope.
    pub path: Option<String>,
    /// Domain scope.
    pub domain: Option<String>,
}

impl CookieOptions {
    /// Defaults derived from the environment configuration.
    ///
    /// `HttpOnly`, `SameSite=Lax`, path `/`, `Secure` only in production and
    /// a lifetime of `MAX_AGE` hours.
    #[must_use]
    pub fn from_config(config: &EnvConfig) -> Self {
        Self {
            http_only: true,
            secure: config.is_production(),
            same_site: SameSite::Lax,
            max_age: Some(config.cookie_max_age()),
            path: Some("/".to_string()),
            domain: None,
        }
    }
}

/// Per-call changes to [`CookieOptions`]. Unset fields keep the default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOverrides {
    /// Overrides [`CookieOptions::http_only`].
    pub http_only: Option<bool>,
    /// Overrides [`CookieOptions::secure`].
    pub secure: Option<bool>,
    /// Overrides [`CookieOptions::same_site`].
    pub same_site: Option<SameSite>,
    /// Overrides [`CookieOptions::max_age`].
    pub max_age: Option<Duration>,
    /// Overrides [`CookieOptions::path`].
    pub path: Option<String>,
    /// Overrides [`CookieOptions::domain`].
    pub domain: Option<String>,
}

impl CookieOverrides {
    /// Applies the overrides on top of `options`.
    #[must_use]
    pub fn apply(&self, mut options: CookieOptions) -> CookieOptions {
        if let Some(http_only) = self.http_only {
            options.http_only = http_only;
        }
        if let Some(secure) = self.secure {
            options.secure = secure;
        }
        if let Some(same_site) = self.same_site {
            options.same_site = same_site;
        }
        if let Some(max_age) = self.max_age {
            options.max_age = Some(max_age);
        }
        if let Some(ref path) = self.path {
            options.path = Some(path.clone());
        }
        if let Some(ref domain) = self.domain {
            options.domain = Some(domain.clone());
        }
        options
    }
}

/// Options for [`sign_cookie`].
#[derive(Debug, Clone)]
pub struct SignCookieOptions {
    /// Cookie name. Defaults to `token`.
    pub name: String,
    /// Signing secret. Defaults to `JWT_SECRET`.
    pub secret: Option<String>,
    /// Credential lifetime. Defaults to `JWT_EXPIRATION`.
    pub expires_in: Option<Duration>,
    /// Cookie attribute overrides.
    pub cookie: CookieOverrides,
}

impl Default for SignCookieOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            secret: None,
            expires_in: None,
            cookie: CookieOverrides::default(),
        }
    }
}

impl SignCookieOptions {
    /// Sets the cookie name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the signing secret.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Sets the credential lifetime.
    pub fn expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }

    /// Sets the cookie attribute overrides.
    pub fn cookie(mut self, overrides: CookieOverrides) -> Self {
        self.cookie = overrides;
        self
    }
}

/// Signs `payload`, stores the token in a cookie on `response` and returns it.
///
/// The secret and lifetime fall back to `config`; the cookie attributes
/// start from [`CookieOptions::from_config`] and then take
/// `options.cookie` on top.
pub fn sign_cookie(
    response: &mut Response,
    payload: &Value,
    options: &SignCookieOptions,
    config: &EnvConfig,
) -> Result<String, SignError> {
    let secret = options.secret.as_deref().unwrap_or(&config.jwt_secret);
    let expires_in = options.expires_in.unwrap_or(config.jwt_expiration);
    let token = JwtSigner::new(secret, expires_in).sign(payload)?;

    let cookie_options = options.cookie.apply(CookieOptions::from_config(config));
    SetCookie::with_options(&options.name, &token, &cookie_options).append_to(response)?;

    tracing::debug!(
        cookie = %options.name,
        secure = cookie_options.secure,
        expires_in = ?expires_in,
        "Issued credential cookie"
    );
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::JwtVerifier;
    use crate::types::ResponseExt;
    use http::StatusCode;
    use palisade_config::Environment;
    use serde_json::json;

    fn config(environment: Environment) -> EnvConfig {
        EnvConfig {
            environment,
            jwt_secret: "cookie-secret".to_string(),
            ..EnvConfig::default()
        }
    }

    fn set_cookie_header(response: &Response) -> String {
        response.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_parse_multiple_cookies() {
        let cookies = Cookies::parse("session=abc123; theme=dark; lang=en");
        assert_eq!(cookies.get("session"), Some("abc123"));
        assert_eq!(cookies.get("theme"), Some("dark"));
        assert_eq!(cookies.len(), 3);
        assert!(cookies.contains("lang"));
    }

    #[test]
    fn test_parse_quotes_spaces_and_junk() {
        let cookies = Cookies::parse(" a = \"quoted\" ;flag; =orphan; b=x=y");
        assert_eq!(cookies.get("a"), Some("quoted"));
        assert_eq!(cookies.get("b"), Some("x=y"));
        assert!(!cookies.contains("flag"));
        assert_eq!(cookies.len(), 2);
    }

    #[test]
    fn test_first_duplicate_wins_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("token=first"));
        headers.append(header::COOKIE, HeaderValue::from_static("token=second; other=1"));

        let cookies = Cookies::from_headers(&headers);
        assert_eq!(cookies.get("token"), Some("first"));
        assert_eq!(cookies.get("other"), Some("1"));
    }

    #[test]
    fn test_empty_cookies() {
        let cookies = Cookies::from_headers(&HeaderMap::new());
        assert!(cookies.is_empty());
        assert_eq!(cookies.get("token"), None);
    }

    #[test]
    fn test_set_cookie_all_attributes() {
        let header = SetCookie::new("id", "1")
            .domain("example.com")
            .path("/app")
            .max_age(Duration::from_secs(60))
            .secure(true)
            .http_only(true)
            .same_site(SameSite::None)
            .to_header_value();
        assert_eq!(
            header,
            "id=1; Domain=example.com; Path=/app; Max-Age=60; Secure; HttpOnly; SameSite=None"
        );
    }

    #[test]
    fn test_options_from_config() {
        let development = CookieOptions::from_config(&config(Environment::Development));
        assert!(development.http_only);
        assert!(!development.secure);
        assert_eq!(development.same_site, SameSite::Lax);
        assert_eq!(development.max_age, Some(Duration::from_secs(24 * 3600)));

        let production = CookieOptions::from_config(&config(Environment::Production));
        assert!(production.secure);
    }

    #[test]
    fn test_overrides_replace_only_set_fields() {
        let overrides = CookieOverrides {
            same_site: Some(SameSite::Strict),
            max_age: Some(Duration::from_secs(120)),
            ..CookieOverrides::default()
        };
        let options = overrides.apply(CookieOptions::from_config(&config(Environment::Production)));
        assert_eq!(options.same_site, SameSite::Strict);
        assert_eq!(options.max_age, Some(Duration::from_secs(120)));
        assert!(options.http_only);
        assert!(options.secure);
        assert_eq!(options.path.as_deref(), Some("/"));
    }

    #[test]
    fn test_sign_cookie_defaults() {
        let config = config(Environment::Development);
        let mut response = Response::json(StatusCode::OK, &json!({}));

        let token = sign_cookie(
            &mut response,
            &json!({"sub": "5", "role": "admin"}),
            &SignCookieOptions::default(),
            &config,
        )
        .unwrap();

        let header = set_cookie_header(&response);
        assert_eq!(
            header,
            format!("token={token}; Path=/; Max-Age=86400; HttpOnly; SameSite=Lax")
        );

        let claims = JwtVerifier::from_config(&config).verify_token(&token).unwrap();
        assert_eq!(claims.get_str("role"), Some("admin"));
        assert_eq!(
            claims.expires_at().unwrap() - claims.issued_at().unwrap(),
            3600
        );
    }

    #[test]
    fn test_sign_cookie_custom_options() {
        let config = config(Environment::Production);
        let mut response = Response::json(StatusCode::OK, &json!({}));
        let options = SignCookieOptions::default()
            .name("session")
            .secret("other-secret")
            .expires_in(Duration::from_secs(60))
            .cookie(CookieOverrides {
                secure: Some(false),
                ..CookieOverrides::default()
            });

        let token = sign_cookie(&mut response, &json!({"sub": "5"}), &options, &config).unwrap();

        let header = set_cookie_header(&response);
        assert!(header.starts_with("session="));
        assert!(!header.contains("Secure"));
        assert!(JwtVerifier::new("other-secret").verify_token(&token).is_ok());
        assert!(JwtVerifier::from_config(&config).verify_token(&token).is_err());
    }

    #[test]
    fn test_sign_cookie_rejects_non_object() {
        let mut response = Response::json(StatusCode::OK, &json!({}));
        let result = sign_cookie(
            &mut response,
            &json!(["not", "claims"]),
            &SignCookieOptions::default(),
            &config(Environment::Test),
        );
        assert!(matches!(result, Err(SignError::NotAnObject("array"))));
        assert!(!response.headers().contains_key(header::SET_COOKIE));
    }
}
