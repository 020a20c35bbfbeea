//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for resolving [`EnvConfig`]
//! from built-in defaults, a TOML file, a `.env` file, the live process
//! environment and explicit overrides.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::{
    DEFAULT_ENVIRONMENT, DEFAULT_JWT_EXPIRATION, DEFAULT_JWT_SECRET, DEFAULT_MAX_AGE_HOURS,
    JWT_EXPIRATION, JWT_SECRET, MAX_AGE, NODE_ENV,
};
use crate::span::parse_span;
use crate::{ConfigError, EnvConfig, Environment};

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Where the live environment layer comes from.
#[derive(Clone)]
enum EnvSource {
    /// The process environment.
    Process,
    /// An injected lookup function.
    Lookup(Lookup),
    /// No environment layer.
    Disabled,
}

/// Configuration loader with layered approach.
///
/// Layers are merged key by key, later layers winning:
/// 1. Built-in defaults
/// 2. TOML file
/// 3. `.env` file
/// 4. Live environment
/// 5. Explicit overrides
///
/// # Example
///
/// ```
/// use palisade_config::{ConfigLoader, Environment};
///
/// let config = ConfigLoader::new()
///     .with_env_lookup(|key| match key {
///         "NODE_ENV" => Some("production".to_string()),
///         "JWT_SECRET" => Some("s3cret".to_string()),
///         _ => None,
///     })
///     .with_override("MAX_AGE", "2")
///     .load()
///     .unwrap();
///
/// assert_eq!(config.environment, Environment::Production);
/// assert_eq!(config.jwt_secret, "s3cret");
/// assert_eq!(config.max_age_hours, 2);
/// ```
#[derive(Clone)]
pub struct ConfigLoader {
    defaults: BTreeMap<String, String>,
    file: BTreeMap<String, String>,
    dotenv: BTreeMap<String, String>,
    env: EnvSource,
    overrides: BTreeMap<String, String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env = match self.env {
            EnvSource::Process => "process",
            EnvSource::Lookup(_) => "lookup",
            EnvSource::Disabled => "disabled",
        };
        f.debug_struct("ConfigLoader")
            .field("defaults", &self.defaults.keys().collect::<Vec<_>>())
            .field("file", &self.file.keys().collect::<Vec<_>>())
            .field("dotenv", &self.dotenv.keys().collect::<Vec<_>>())
            .field("env", &env)
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader with built-in defaults.
    ///
    /// The process environment is consulted by default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            defaults: builtin_defaults(),
            file: BTreeMap::new(),
            dotenv: BTreeMap::new(),
            env: EnvSource::Process,
            overrides: BTreeMap::new(),
        }
    }

    /// Reset the defaults layer to the built-in values.
    ///
    /// This is done by `new()`, but can be chained for clarity.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.defaults = builtin_defaults();
        self
    }

    /// Load values from a TOML file.
    ///
    /// The file is a flat table of keys (`JWT_SECRET = "..."`). Keys are
    /// upper-cased; strings, integers, floats and booleans are accepted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file does not exist, cannot be read,
    /// is not valid TOML, or holds a nested value.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        self.file.extend(parse_table(&content)?);

        Ok(self)
    }

    /// Load values from a TOML file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load values from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use palisade_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .without_env()
    ///     .with_string("JWT_EXPIRATION = \"15m\"\nMAX_AGE = 1")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.jwt_expiration.as_secs(), 900);
    /// assert_eq!(config.max_age_hours, 1);
    /// ```
    pub fn with_string(mut self, content: &str) -> Result<Self, ConfigError> {
        self.file.extend(parse_table(content)?);
        Ok(self)
    }

    /// Load the `.env` file from the current directory or its parents.
    ///
    /// Missing files are ignored. Values are kept in their own layer; the
    /// process environment is not modified.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a `.env` file exists but cannot be parsed.
    pub fn with_dotenv(mut self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv_iter() {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item?;
                    self.dotenv.insert(key, value);
                }
                Ok(self)
            }
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Load a specific `.env`-format file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or cannot be parsed.
    pub fn with_dotenv_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        for item in dotenvy::from_path_iter(path)? {
            let (key, value) = item?;
            self.dotenv.insert(key, value);
        }
        Ok(self)
    }

    /// Resolve the environment layer through `lookup` instead of the process
    /// environment.
    ///
    /// The lookup is asked for the recognized keys and for every key present
    /// in another layer.
    #[must_use]
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = EnvSource::Lookup(Arc::new(lookup));
        self
    }

    /// Skip the environment layer entirely.
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.env = EnvSource::Disabled;
        self
    }

    /// Force a value, taking precedence over every other layer.
    #[must_use]
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Merge all layers and build a validated [`EnvConfig`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `JWT_SECRET` is empty
    /// - `JWT_EXPIRATION` is not a valid time span
    /// - `MAX_AGE` is not a non-negative integer
    pub fn load(self) -> Result<EnvConfig, ConfigError> {
        let mut values = self.defaults;
        values.extend(self.file);
        values.extend(self.dotenv);

        match &self.env {
            EnvSource::Process => values.extend(
                env::vars_os()
                    .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?))),
            ),
            EnvSource::Lookup(lookup) => {
                let keys: Vec<String> = [NODE_ENV, JWT_SECRET, JWT_EXPIRATION, MAX_AGE]
                    .iter()
                    .map(ToString::to_string)
                    .chain(values.keys().cloned())
                    .chain(self.overrides.keys().cloned())
                    .collect();
                for key in keys {
                    if let Some(value) = lookup(&key) {
                        values.insert(key, value);
                    }
                }
            }
            EnvSource::Disabled => {}
        }

        values.extend(self.overrides);
        build(values)
    }
}

fn builtin_defaults() -> BTreeMap<String, String> {
    BTreeMap::from([
        (NODE_ENV.to_string(), DEFAULT_ENVIRONMENT.to_string()),
        (JWT_SECRET.to_string(), DEFAULT_JWT_SECRET.to_string()),
        (JWT_EXPIRATION.to_string(), DEFAULT_JWT_EXPIRATION.to_string()),
        (MAX_AGE.to_string(), DEFAULT_MAX_AGE_HOURS.to_string()),
    ])
}

fn parse_table(content: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let table: toml::Table = toml::from_str(content)?;

    table
        .into_iter()
        .map(|(key, value)| {
            let key = key.to_uppercase();
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(ConfigError::invalid_value(
                        key,
                        format!("expected a scalar, found {}", other.type_str()),
                    ))
                }
            };
            Ok((key, value))
        })
        .collect()
}

fn build(mut values: BTreeMap<String, String>) -> Result<EnvConfig, ConfigError> {
    let environment = values
        .remove(NODE_ENV)
        .map_or_else(Environment::default, |name| Environment::parse(&name));

    let jwt_secret = values.remove(JWT_SECRET).unwrap_or_default();
    if jwt_secret.is_empty() {
        return Err(ConfigError::invalid_value(JWT_SECRET, "must not be empty"));
    }

    let raw_expiration = values
        .remove(JWT_EXPIRATION)
        .unwrap_or_else(|| DEFAULT_JWT_EXPIRATION.to_string());
    let jwt_expiration = parse_span(&raw_expiration).ok_or_else(|| {
        ConfigError::invalid_value(
            JWT_EXPIRATION,
            format!("invalid time span: {raw_expiration:?}"),
        )
    })?;

    let max_age_hours = match values.remove(MAX_AGE) {
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            ConfigError::invalid_value(MAX_AGE, format!("expected a non-negative integer, got {raw:?}"))
        })?,
        None => DEFAULT_MAX_AGE_HOURS,
    };

    let config = EnvConfig {
        environment,
        jwt_secret,
        jwt_expiration,
        max_age_hours,
        extra: values,
    };

    if config.is_production() && config.uses_placeholder_secret() {
        tracing::warn!(
            environment = %config.environment,
            "JWT_SECRET is still the built-in placeholder; set a real secret for production"
        );
    }

    tracing::debug!(
        environment = %config.environment,
        jwt_expiration_secs = config.jwt_expiration.as_secs(),
        max_age_hours = config.max_age_hours,
        "Configuration resolved"
    );

    Ok(config)
}
