//! Stage factory bound to one configuration.

use palisade_config::{ConfigError, ConfigLoader, EnvConfig};
use palisade_middleware::cookie::CookieOptions;
use palisade_middleware::schema::Schema;
use palisade_middleware::stages::{
    create_rate_limiter, AuthGuard, RateLimiter, RateLimiterConfig, RequestIdMiddleware, RequestSource,
    RequestValidator, RoleAuthorizer,
};
use palisade_middleware::{Boundary, JwtSigner, JwtVerifier, Response, SignCookieOptions, SignError};
use palisade_telemetry::{init_logging, LogConfig, TelemetryError};
use serde_json::Value;
use std::sync::Arc;

/// Builds every stage from one shared [`EnvConfig`].
///
/// Cloning a toolkit is cheap; all clones share the same configuration.
///
/// # Example
///
/// ```
/// use palisade::config::ConfigLoader;
/// use palisade::Toolkit;
///
/// let toolkit = Toolkit::load(
///     ConfigLoader::new()
///         .without_env()
///         .with_override("JWT_SECRET", "s3cret"),
/// )
/// .unwrap();
///
/// assert_eq!(toolkit.config().jwt_secret, "s3cret");
/// let guard = toolkit.auth_guard();
/// ```
#[derive(Debug, Clone)]
pub struct Toolkit {
    config: Arc<EnvConfig>,
}

impl Toolkit {
    /// Creates a toolkit for the given configuration.
    pub fn new(config: EnvConfig) -> Self {
        Self::from_shared(Arc::new(config))
    }

    /// Creates a toolkit sharing an existing configuration.
    pub fn from_shared(config: Arc<EnvConfig>) -> Self {
        if config.is_production() && config.uses_placeholder_secret() {
            tracing::warn!("JWT_SECRET is the built-in placeholder; set a real secret in production");
        }
        Self { config }
    }

    /// Resolves the configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(ConfigLoader::new().with_dotenv()?)
    }

    /// Resolves the configuration with a prepared loader.
    pub fn load(loader: ConfigLoader) -> Result<Self, ConfigError> {
        Ok(Self::new(loader.load()?))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Returns a shared handle to the configuration.
    pub fn shared_config(&self) -> Arc<EnvConfig> {
        Arc::clone(&self.config)
    }

    /// Returns the logging preset for the configured environment.
    pub fn log_config(&self) -> LogConfig {
        LogConfig::for_environment(&self.config.environment)
    }

    /// Installs the global logging subscriber for the configured environment.
    pub fn init_logging(&self) -> Result<(), TelemetryError> {
        init_logging(&self.log_config())
    }

    /// Credential guard verifying tokens signed with `JWT_SECRET`.
    pub fn auth_guard(&self) -> Boundary<AuthGuard> {
        AuthGuard::from_config(&self.config).into_middleware()
    }

    /// Role check allowing the given roles.
    pub fn authorize<I, S>(&self, roles: I) -> Boundary<RoleAuthorizer>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RoleAuthorizer::new(roles).into_middleware()
    }

    /// Body validation against `schema`.
    pub fn validate<S: Schema>(&self, schema: S) -> Boundary<RequestValidator<S>> {
        self.validate_source(schema, RequestSource::Body)
    }

    /// Validation of the chosen request fragment against `schema`.
    pub fn validate_source<S: Schema>(&self, schema: S, source: RequestSource) -> Boundary<RequestValidator<S>> {
        RequestValidator::new(schema).source(source).into_middleware()
    }

    /// Request correlation stage.
    pub fn request_id(&self) -> RequestIdMiddleware {
        RequestIdMiddleware::new()
    }

    /// Rate limiter with its own in-memory store.
    pub fn rate_limiter(&self, config: RateLimiterConfig) -> Boundary<RateLimiter> {
        create_rate_limiter(config)
    }

    /// Token signer using `JWT_SECRET` and `JWT_EXPIRATION`.
    pub fn signer(&self) -> JwtSigner {
        JwtSigner::from_config(&self.config)
    }

    /// Token verifier using `JWT_SECRET`.
    pub fn verifier(&self) -> JwtVerifier {
        JwtVerifier::from_config(&self.config)
    }

    /// Default credential cookie attributes for the configured environment.
    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions::from_config(&self.config)
    }

    /// Signs `payload` into a credential cookie on `response`.
    pub fn sign_cookie(
        &self,
        response: &mut Response,
        payload: &Value,
        options: &SignCookieOptions,
    ) -> Result<String, SignError> {
        palisade_middleware::sign_cookie(response, payload, options, &self.config)
    }
}
