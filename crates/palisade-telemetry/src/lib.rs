//! Structured logging for Palisade.
//!
//! Palisade stages log through [`tracing`]; this crate installs the
//! subscriber that turns those events into output:
//!
//! - development: pretty, `debug` level, span events and source locations
//! - production: JSON lines, `info` level
//! - test: pretty, `warn` level
//!
//! # Example
//!
//! ```rust,ignore
//! use palisade_config::ConfigLoader;
//! use palisade_telemetry::{init_logging, LogConfig};
//!
//! let config = ConfigLoader::new().load()?;
//! init_logging(&LogConfig::for_environment(&config.environment))?;
//! ```
//!
//! # Levels
//!
//! | Level | Emitted for |
//! |-------|-------------|
//! | `error` | Failures answered with a 500 |
//! | `warn` | Suspicious configuration, e.g. the placeholder secret in production |
//! | `debug` | Stage rejections (missing credential, role denied, rate limited) |
//! | `trace` | Stages letting a request through |

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

#[doc(hidden)]
pub mod __private {
    pub use tracing;
}
