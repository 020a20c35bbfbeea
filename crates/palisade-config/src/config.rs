//! Resolved environment configuration.

use crate::span::format_span;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Key selecting the runtime environment.
pub const NODE_ENV: &str = "NODE_ENV";
/// Key holding the credential signing secret.
pub const JWT_SECRET: &str = "JWT_SECRET";
/// Key holding the credential lifetime.
pub const JWT_EXPIRATION: &str = "JWT_EXPIRATION";
/// Key holding the cookie lifetime in hours.
pub const MAX_AGE: &str = "MAX_AGE";

/// Built-in default for [`NODE_ENV`].
pub const DEFAULT_ENVIRONMENT: &str = "development";
/// Built-in placeholder for [`JWT_SECRET`]. Must be overridden in production.
pub const DEFAULT_JWT_SECRET: &str = "default_secret";
/// Built-in default for [`JWT_EXPIRATION`].
pub const DEFAULT_JWT_EXPIRATION: &str = "1h";
/// Built-in default for [`MAX_AGE`], in hours.
pub const DEFAULT_MAX_AGE_HOURS: u64 = 24;

/// Runtime environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// `development`
    #[default]
    Development,
    /// `production`
    Production,
    /// `test`
    Test,
    /// Any other value, kept verbatim.
    Other(String),
}

impl Environment {
    /// Parses an environment name. Known names are matched case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed.eq_ignore_ascii_case("development") {
            Self::Development
        } else if trimmed.eq_ignore_ascii_case("production") {
            Self::Production
        } else if trimmed.eq_ignore_ascii_case("test") {
            Self::Test
        } else {
            Self::Other(trimmed.to_string())
        }
    }

    /// Returns the environment name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
            Self::Other(name) => name,
        }
    }

    /// Returns `true` for [`Environment::Production`].
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Environment {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

/// Process-wide configuration, resolved once at startup.
///
/// Build it with [`ConfigLoader`](crate::ConfigLoader) and share it behind an
/// `Arc`; nothing mutates it afterwards.
///
/// # Example
///
/// ```
/// use palisade_config::{EnvConfig, Environment};
/// use std::time::Duration;
///
/// let config = EnvConfig::default();
/// assert_eq!(config.environment, Environment::Development);
/// assert_eq!(config.jwt_expiration, Duration::from_secs(3600));
/// assert_eq!(config.cookie_max_age_millis(), 24 * 3600 * 1000);
/// assert_eq!(config.get("JWT_EXPIRATION").as_deref(), Some("1h"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Runtime environment (`NODE_ENV`).
    pub environment: Environment,
    /// Credential signing secret (`JWT_SECRET`).
    pub jwt_secret: String,
    /// Lifetime of issued credentials (`JWT_EXPIRATION`).
    pub jwt_expiration: Duration,
    /// Cookie lifetime in hours (`MAX_AGE`).
    pub max_age_hours: u64,
    /// Every other resolved key.
    pub extra: BTreeMap<String, String>,
}

impl EnvConfig {
    /// Returns `true` when running in production.
    #[must_use]
    pub const fn is_production(&self) -> bool {
        self.environment.is_production()
    }

    /// Returns `true` while the placeholder secret is still in use.
    #[must_use]
    pub fn uses_placeholder_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    /// Cookie lifetime.
    #[must_use]
    pub const fn cookie_max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours.saturating_mul(3600))
    }

    /// Cookie lifetime in milliseconds (`MAX_AGE * 3600 * 1000`).
    #[must_use]
    pub const fn cookie_max_age_millis(&self) -> u64 {
        self.max_age_hours.saturating_mul(3_600_000)
    }

    /// Returns the resolved value of any key.
    ///
    /// Recognized keys are rendered from their typed fields; anything else
    /// comes from [`EnvConfig::extra`].
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        match key {
            NODE_ENV => Some(Cow::Borrowed(self.environment.as_str())),
            JWT_SECRET => Some(Cow::Borrowed(self.jwt_secret.as_str())),
            JWT_EXPIRATION => Some(Cow::Owned(format_span(self.jwt_expiration))),
            MAX_AGE => Some(Cow::Owned(self.max_age_hours.to_string())),
            other => self.extra.get(other).map(|value| Cow::Borrowed(value.as_str())),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expiration: Duration::from_secs(3600),
            max_age_hours: DEFAULT_MAX_AGE_HOURS,
            extra: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvConfig")
            .field("environment", &self.environment)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiration", &self.jwt_expiration)
            .field("max_age_hours", &self.max_age_hours)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse(" Production "), Environment::Production);
        assert_eq!(Environment::parse("test"), Environment::Test);
        assert_eq!(
            Environment::parse("staging"),
            Environment::Other("staging".to_string())
        );
        assert_eq!(Environment::parse("staging").to_string(), "staging");
    }

    #[test]
    fn test_get_recognized_and_extra_keys() {
        let mut config = EnvConfig::default();
        config.extra.insert("PORT".to_string(), "8080".to_string());

        assert_eq!(config.get(NODE_ENV).as_deref(), Some("development"));
        assert_eq!(config.get(MAX_AGE).as_deref(), Some("24"));
        assert_eq!(config.get("PORT").as_deref(), Some("8080"));
        assert_eq!(config.get("MISSING"), None);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = EnvConfig {
            jwt_secret: "hunter2".to_string(),
            ..EnvConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_placeholder_secret_detection() {
        assert!(EnvConfig::default().uses_placeholder_secret());
        let config = EnvConfig {
            jwt_secret: "s3cret".to_string(),
            ..EnvConfig::default()
        };
        assert!(!config.uses_placeholder_secret());
    }
}
