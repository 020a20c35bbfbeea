//! Error types for Palisade.
//!
//! Every failure raised inside a guarded pipeline stage is one of the four
//! [`PipelineError`] variants. The set is closed: formatters match on it
//! exhaustively instead of probing runtime types.
//!
//! | Variant | Raised by | Client sees |
//! |---|---|---|
//! | `Validation` | schema validation | `400 Validation error` + issue map |
//! | `Domain` | explicit [`AppError`] | the error's own status/message/details |
//! | `Credential` | token verification | `401 Unauthorized` |
//! | `Unknown` | anything else | `500 Something went wrong` |

use crate::message;
use crate::validation::ValidationError;
use http::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;

/// Result type alias using [`PipelineError`].
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Discriminant of a [`PipelineError`], useful for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Schema validation failure.
    Validation,
    /// Explicitly raised domain error.
    Domain,
    /// Credential verification failure.
    Credential,
    /// Unrecognized failure.
    Unknown,
}

impl ErrorKind {
    /// Returns a stable snake_case name for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Domain => "domain",
            Self::Credential => "credential",
            Self::Unknown => "unknown",
        }
    }
}

/// The closed set of failures a pipeline stage can raise.
///
/// # Example
///
/// ```
/// use palisade_core::{AppError, ErrorKind, PipelineError};
///
/// let error: PipelineError = AppError::forbidden().into();
/// assert_eq!(error.kind(), ErrorKind::Domain);
///
/// let error = PipelineError::unknown(std::io::Error::other("disk on fire"));
/// assert_eq!(error.kind(), ErrorKind::Unknown);
/// ```
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A request fragment did not match its schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A domain error raised explicitly by pipeline or handler code.
    #[error(transparent)]
    Domain(#[from] AppError),

    /// A credential failed signature or time-window verification.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Any other failure. Never exposed to clients.
    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl PipelineError {
    /// Wraps an arbitrary error as [`PipelineError::Unknown`].
    pub fn unknown(error: impl Into<anyhow::Error>) -> Self {
        Self::Unknown(error.into())
    }

    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Domain(_) => ErrorKind::Domain,
            Self::Credential(_) => ErrorKind::Credential,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

/// Reasons a signed credential can fail verification.
///
/// The variants exist for server-side diagnostics only. Every variant is
/// reported to clients as the same `401 Unauthorized` body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// The token is structurally invalid or its signature does not match.
    #[error("malformed credential: {reason}")]
    Malformed {
        /// Verifier-specific description.
        reason: String,
    },

    /// The token's `exp` claim is in the past.
    #[error("credential expired")]
    Expired,

    /// The token's `nbf` claim is in the future.
    #[error("credential not yet valid")]
    NotYetValid,
}

impl CredentialError {
    /// Creates a [`CredentialError::Malformed`] with the given reason.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// A domain error carrying an HTTP status, a message and optional details.
///
/// Details are spread into the top level of the normalized error body.
///
/// # Example
///
/// ```
/// use palisade_core::AppError;
/// use http::StatusCode;
/// use serde_json::json;
///
/// let error = AppError::new(StatusCode::NOT_FOUND, "User not found")
///     .with_detail("user_id", json!("u-42"));
///
/// assert_eq!(error.status(), StatusCode::NOT_FOUND);
/// assert_eq!(error.details()["user_id"], "u-42");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct AppError {
    status: StatusCode,
    message: String,
    details: Map<String, Value>,
}

impl AppError {
    /// Creates a domain error with the given status and message.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: Map::new(),
        }
    }

    /// `400 Bad Request` with a custom message.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// `401 Unauthorized` with the canonical message.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message::UNAUTHORIZED)
    }

    /// `403 Forbidden` with the canonical message.
    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, message::FORBIDDEN)
    }

    /// `404 Not Found` with a custom message.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// `409 Conflict` with a custom message.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// `500 Internal Server Error` with a custom message.
    ///
    /// Errors with a 500 status are logged by the boundary before responding.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Adds a single detail field.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    /// Merges a details payload.
    ///
    /// Object payloads are merged field by field, later keys winning. Any
    /// other JSON value is stored under the `error` key.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        match details {
            Value::Object(fields) => self.details.extend(fields),
            Value::Null => {}
            other => {
                self.details.insert("error".to_string(), other);
            }
        }
        self
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the structured details.
    #[must_use]
    pub const fn details(&self) -> &Map<String, Value> {
        &self.details
    }
}
