//! Schema validation issue model.
//!
//! A failed validation produces a [`ValidationError`] holding an ordered
//! list of [`ValidationIssue`]s. For responses the list is flattened into an
//! [`IssueMap`] keyed by the dot-joined field path.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Well-known issue codes.
pub mod codes {
    /// Value has the wrong JSON type.
    pub const INVALID_TYPE: &str = "invalid_type";
    /// String is shorter than its minimum length.
    pub const TOO_SMALL: &str = "too_small";
    /// String is longer than its maximum length.
    pub const TOO_BIG: &str = "too_big";
    /// String does not match its format (email, uuid, ...).
    pub const INVALID_STRING: &str = "invalid_string";
    /// Object carries keys the schema does not allow.
    pub const UNRECOGNIZED_KEYS: &str = "unrecognized_keys";
    /// Fragment could not be parsed at all.
    pub const INVALID_JSON: &str = "invalid_json";
    /// Schema-specific failure.
    pub const CUSTOM: &str = "custom";
}

/// One segment of a field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object key.
    Key(String),
    /// Array index.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A single schema validation issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Path from the fragment root to the offending value.
    pub path: Vec<PathSegment>,
    /// Machine-readable issue code (see [`codes`]).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Expected type, when the issue is a type mismatch.
    pub expected: Option<String>,
    /// Received type, when the issue is a type mismatch.
    pub received: Option<String>,
}

impl ValidationIssue {
    /// Creates an issue without expected/received information.
    #[must_use]
    pub fn new(path: Vec<PathSegment>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path,
            code: code.into(),
            message: message.into(),
            expected: None,
            received: None,
        }
    }

    /// Creates an `invalid_type` issue.
    #[must_use]
    pub fn invalid_type(
        path: Vec<PathSegment>,
        expected: impl Into<String>,
        received: impl Into<String>,
    ) -> Self {
        let expected = expected.into();
        let received = received.into();
        let message = if received == "undefined" {
            "Required".to_string()
        } else {
            format!("Expected {expected}, received {received}")
        };

        Self {
            path,
            code: codes::INVALID_TYPE.to_string(),
            message,
            expected: Some(expected),
            received: Some(received),
        }
    }

    /// Sets the expected type.
    #[must_use]
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Sets the received type.
    #[must_use]
    pub fn with_received(mut self, received: impl Into<String>) -> Self {
        self.received = Some(received.into());
        self
    }

    /// Returns the dot-joined path (`""` for the fragment root).
    #[must_use]
    pub fn dotted_path(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Schema validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validation failed with {} issue(s)", .issues.len())]
pub struct ValidationError {
    issues: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Creates a validation error from issues in discovery order.
    #[must_use]
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// Creates a validation error with one issue.
    #[must_use]
    pub fn single(issue: ValidationIssue) -> Self {
        Self {
            issues: vec![issue],
        }
    }

    /// Returns the issues in discovery order.
    #[must_use]
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Flattens the issues into an [`IssueMap`].
    #[must_use]
    pub fn to_issue_map(&self) -> IssueMap {
        flatten_issues(&self.issues)
    }
}

/// Per-field summary stored in an [`IssueMap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueSummary {
    /// Issue code.
    pub code: String,
    /// Issue message.
    pub message: String,
    /// Expected type, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Received type, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
}

/// Validation issues keyed by dot-joined path, in discovery order.
pub type IssueMap = IndexMap<String, IssueSummary>;

/// Flattens issues into a map keyed by dot-joined path.
///
/// A later issue on the same path replaces the earlier summary but keeps its
/// position.
///
/// # Example
///
/// ```
/// use palisade_core::validation::{flatten_issues, ValidationIssue};
///
/// let issues = vec![
///     ValidationIssue::invalid_type(vec!["user".into(), "age".into()], "number", "string"),
///     ValidationIssue::new(vec!["email".into()], "invalid_string", "Invalid email"),
/// ];
///
/// let map = flatten_issues(&issues);
/// let keys: Vec<_> = map.keys().cloned().collect();
/// assert_eq!(keys, vec!["user.age", "email"]);
/// assert_eq!(map["user.age"].expected.as_deref(), Some("number"));
/// assert!(map["email"].expected.is_none());
/// ```
#[must_use]
pub fn flatten_issues(issues: &[ValidationIssue]) -> IssueMap {
    let mut map = IssueMap::with_capacity(issues.len());
    for issue in issues {
        map.insert(
            issue.dotted_path(),
            IssueSummary {
                code: issue.code.clone(),
                message: issue.message.clone(),
                expected: issue.expected.clone(),
                received: issue.received.clone(),
            },
        );
    }
    map
}
