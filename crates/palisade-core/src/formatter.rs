//! Error classification and normalization.
//!
//! An [`ErrorFormatter`] turns any [`PipelineError`] into exactly one
//! [`NormalizedError`]: a status, a message and optional extra fields that
//! are flattened into the top level of the JSON body.
//!
//! # Classification
//!
//! [`DefaultErrorFormatter`] maps the taxonomy as follows:
//!
//! | Error | Status | Message | Extra |
//! |---|---|---|---|
//! | Validation | 400 | `Validation error` | `error`: issue map |
//! | Domain | own status | own message | own details |
//! | Credential | 401 | `Unauthorized` | — |
//! | Unknown | 500 | `Something went wrong` | — |
//!
//! Use [`normalize`] rather than calling a formatter directly: it also
//! records every 500-class failure to the log before the generic message
//! reaches the client.

use crate::error::PipelineError;
use crate::message;
use http::StatusCode;
use serde_json::{Map, Value};

/// Normalized, client-facing error body.
///
/// # Example
///
/// ```
/// use palisade_core::NormalizedError;
/// use http::StatusCode;
/// use serde_json::{json, Value};
///
/// let body: Value = NormalizedError::new(StatusCode::FORBIDDEN, "Forbidden").into();
/// assert_eq!(body, json!({"status": 403, "message": "Forbidden"}));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedError {
    /// HTTP status for the response.
    pub status: StatusCode,
    /// Client-facing message.
    pub message: String,
    /// Additional top-level fields.
    pub extra: Map<String, Value>,
}

impl NormalizedError {
    /// Creates a normalized error without extra fields.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            extra: Map::new(),
        }
    }

    /// Adds an extra top-level field.
    ///
    /// `status` and `message` are reserved and cannot be shadowed.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if key != "status" && key != "message" {
            self.extra.insert(key, value);
        }
        self
    }

    /// Returns the fixed response for unrecognized failures.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message::SOMETHING_WENT_WRONG)
    }

    /// Renders the JSON body `{status, message, ...extra}`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut body = Map::with_capacity(self.extra.len() + 2);
        body.insert("status".to_string(), Value::from(self.status.as_u16()));
        body.insert("message".to_string(), Value::from(self.message.clone()));
        for (key, value) in &self.extra {
            body.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(body)
    }
}

impl From<NormalizedError> for Value {
    fn from(error: NormalizedError) -> Self {
        error.to_json()
    }
}

/// Classifies pipeline errors into client-facing bodies.
///
/// Implementations must be total: every input yields a body and nothing
/// panics. Closures of the right shape implement this trait, so a custom
/// formatter can be as small as:
///
/// ```
/// use palisade_core::{ErrorFormatter, NormalizedError, PipelineError};
/// use http::StatusCode;
///
/// let teapot = |_: &PipelineError| NormalizedError::new(StatusCode::IM_A_TEAPOT, "short and stout");
/// let error = PipelineError::unknown(anyhow::anyhow!("kettle"));
/// assert_eq!(teapot.format(&error).status, StatusCode::IM_A_TEAPOT);
/// ```
pub trait ErrorFormatter: Send + Sync + 'static {
    /// Produces the normalized body for an error.
    fn format(&self, error: &PipelineError) -> NormalizedError;
}

impl<F> ErrorFormatter for F
where
    F: Fn(&PipelineError) -> NormalizedError + Send + Sync + 'static,
{
    fn format(&self, error: &PipelineError) -> NormalizedError {
        self(error)
    }
}

/// The default classification described in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorFormatter;

impl ErrorFormatter for DefaultErrorFormatter {
    fn format(&self, error: &PipelineError) -> NormalizedError {
        match error {
            PipelineError::Validation(validation) => {
                let issues = serde_json::to_value(validation.to_issue_map()).unwrap_or_default();
                NormalizedError::new(StatusCode::BAD_REQUEST, message::VALIDATION_ERROR)
                    .with_field("error", issues)
            }
            PipelineError::Domain(app) => app.details().iter().fold(
                NormalizedError::new(app.status(), app.message()),
                |normalized, (key, value)| normalized.with_field(key.clone(), value.clone()),
            ),
            PipelineError::Credential(_) => {
                NormalizedError::new(StatusCode::UNAUTHORIZED, message::UNAUTHORIZED)
            }
            PipelineError::Unknown(_) => NormalizedError::internal(),
        }
    }
}

/// Formats an error and records it when the outcome is a 500.
///
/// The raw error is logged server-side only; the returned body never
/// contains it.
pub fn normalize<F>(formatter: &F, error: &PipelineError) -> NormalizedError
where
    F: ErrorFormatter + ?Sized,
{
    let normalized = formatter.format(error);
    if normalized.status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(
            error = %error,
            error.kind = error.kind().as_str(),
            error.debug = ?error,
            "Unhandled error in pipeline stage"
        );
    }
    normalized
}
