//! Structured logging for Palisade.
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and either
//! JSON or human-readable output.
//!
//! # Example
//!
//! ```rust,ignore
//! use palisade_telemetry::logging::{LogConfig, init_logging};
//! use palisade_config::Environment;
//!
//! let config = LogConfig::for_environment(&Environment::Production);
//! init_logging(&config)?;
//!
//! tracing::info!(request_id = "9f2c...", "Processing request");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use palisade_config::Environment;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g., "info", "palisade_middleware=debug,warn").
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to include span events (new, close).
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include thread IDs.
    pub thread_ids: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            thread_ids: false,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
        }
    }

    /// Creates a test configuration that only reports warnings.
    #[must_use]
    pub fn test() -> Self {
        Self {
            level: "warn".to_string(),
            json_format: false,
            ..Self::production()
        }
    }

    /// Picks the preset matching a runtime environment.
    ///
    /// Unrecognized environments get the production preset.
    #[must_use]
    pub fn for_environment(environment: &Environment) -> Self {
        match environment {
            Environment::Development => Self::development(),
            Environment::Test => Self::test(),
            Environment::Production | Environment::Other(_) => Self::production(),
        }
    }

    /// Sets the filter directive.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// Initializes the logging subsystem.
///
/// `RUST_LOG`, when set, takes precedence over [`LogConfig::level`].
///
/// # Errors
///
/// Returns `TelemetryError::InvalidConfig` for an invalid filter and
/// `TelemetryError::LoggingInit` if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directive) if !directive.is_empty() => create_env_filter(&directive)?,
        _ => create_env_filter(&config.level)?,
    };

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns error if the directive is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::InvalidConfig(format!("invalid log filter {filter:?}: {e}")))
}

/// Logs a stage letting a request through.
#[macro_export]
macro_rules! log_stage_passed {
    ($stage:expr, $request_id:expr) => {
        $crate::__private::tracing::trace!(
            stage = $stage,
            request_id = %$request_id,
            "Stage passed"
        );
    };
}

/// Logs a stage rejecting a request.
#[macro_export]
macro_rules! log_stage_rejected {
    ($stage:expr, $request_id:expr, $status:expr, $reason:expr) => {
        $crate::__private::tracing::debug!(
            stage = $stage,
            request_id = %$request_id,
            http.status_code = $status,
            reason = %$reason,
            "Stage rejected request"
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_production() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert!(config.json_format);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert!(!config.json_format);
        assert!(config.span_events);
        assert!(config.file_line_info);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_for_environment() {
        assert!(!LogConfig::for_environment(&Environment::Development).json_format);
        assert!(LogConfig::for_environment(&Environment::Production).json_format);
        assert_eq!(LogConfig::for_environment(&Environment::Test).level, "warn");
        assert!(
            LogConfig::for_environment(&Environment::Other("staging".to_string())).json_format
        );
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("palisade_middleware=debug,warn").is_ok());
        assert!(matches!(
            create_env_filter("palisade=loud"),
            Err(TelemetryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_ok());
    }
}
