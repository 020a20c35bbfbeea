//! Environment configuration for Palisade.
//!
//! This crate resolves the handful of process-wide settings the toolkit
//! needs into an immutable [`EnvConfig`]:
//!
//! | Key | Default | Meaning |
//! |-----|---------|---------|
//! | `NODE_ENV` | `development` | Runtime environment |
//! | `JWT_SECRET` | `default_secret` | Credential signing secret |
//! | `JWT_EXPIRATION` | `1h` | Lifetime of issued credentials |
//! | `MAX_AGE` | `24` | Cookie lifetime in hours |
//!
//! Any other key found in a layer is kept and available through
//! [`EnvConfig::get`].
//!
//! # Example
//!
//! ```no_run
//! use palisade_config::ConfigLoader;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), palisade_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("palisade.toml")?
//!     .with_dotenv()?
//!     .load()?;
//!
//! let shared = Arc::new(config);
//! println!("running in {}", shared.environment);
//! # Ok(())
//! # }
//! ```
//!
//! # Layering
//!
//! The live process environment always wins over file-based values, and
//! [`ConfigLoader::with_override`] wins over everything. Overrides exist for
//! tests; production code should not need them.
//! A key set in the process environment is therefore shadowed by an
//! override of the same key.
//!
//! # Value formats
//!
//! `MAX_AGE` is a whole number of hours; fractional values such as `1.5`
//! are rejected with [`ConfigError::InvalidValue`] rather than truncated.
//! `JWT_EXPIRATION` accepts a span (`90s`, `15m`, `2h`, `7d`) or bare
//! seconds.

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod span;

pub use config::{
    EnvConfig, Environment, DEFAULT_ENVIRONMENT, DEFAULT_JWT_EXPIRATION, DEFAULT_JWT_SECRET,
    DEFAULT_MAX_AGE_HOURS, JWT_EXPIRATION, JWT_SECRET, MAX_AGE, NODE_ENV,
};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use span::{format_span, parse_span};
