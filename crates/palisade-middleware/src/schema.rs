//! Request schemas.
//!
//! A [`Schema`] checks a JSON fragment and may rewrite it in place (for
//! example coercing numbers to strings). Failures are reported as an ordered
//! list of [`ValidationIssue`]s.
//!
//! Most schemas are assembled from synchronous [`Rule`]s; every rule is also
//! a schema. Implement [`Schema`] directly for checks that need to await,
//! such as a database lookup.
//!
//! # Example
//!
//! ```
//! use palisade_middleware::schema::{rules, ObjectSchema, Schema};
//! use serde_json::json;
//!
//! let signup = ObjectSchema::new()
//!     .field("name", rules::string("name"))
//!     .field("email", rules::email());
//!
//! # tokio_test::block_on(async {
//! let mut body = json!({"name": 42, "email": "ada@example.com", "admin": true});
//! signup.validate(&mut body).await.unwrap();
//! assert_eq!(body, json!({"name": "42", "email": "ada@example.com"}));
//!
//! let mut body = json!({"email": "nope"});
//! let error = signup.validate(&mut body).await.unwrap_err();
//! assert_eq!(error.issues()[0].message, "Required");
//! assert_eq!(error.issues()[1].message, "Invalid email");
//! # });
//! ```

use crate::middleware::BoxFuture;
use palisade_core::validation::codes;
use palisade_core::{PathSegment, ValidationError, ValidationIssue};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Validates and normalizes a JSON fragment.
pub trait Schema: Send + Sync + 'static {
    /// Validates `value`, coercing it in place on success.
    fn validate<'a>(&'a self, value: &'a mut Value) -> BoxFuture<'a, Result<(), ValidationError>>;
}

/// A synchronous validation rule.
pub trait Rule: Send + Sync + 'static {
    /// JSON type this rule expects, used in `invalid_type` issues.
    fn expected_type(&self) -> &'static str;

    /// Checks the value at `path`, coercing it in place and appending any
    /// issues.
    fn check(&self, path: &[PathSegment], value: &mut Value, issues: &mut Vec<ValidationIssue>);
}

impl<R: Rule> Schema for R {
    fn validate<'a>(&'a self, value: &'a mut Value) -> BoxFuture<'a, Result<(), ValidationError>> {
        let mut issues = Vec::new();
        self.check(&[], value, &mut issues);
        let result = if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues))
        };
        Box::pin(std::future::ready(result))
    }
}

/// Name of a value's JSON type as reported in issues.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Converts scalars to their string form. Objects, arrays and `null` are
/// rejected with their type name.
fn coerce_string(value: &Value) -> Result<String, &'static str> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(type_name(other)),
    }
}

/// Coerces the value to a string, reporting a type issue on failure.
fn coerced<'v>(
    path: &[PathSegment],
    value: &'v mut Value,
    issues: &mut Vec<ValidationIssue>,
) -> Option<&'v str> {
    match coerce_string(value) {
        Ok(s) => {
            *value = Value::String(s);
            value.as_str()
        }
        Err(received) => {
            issues.push(ValidationIssue::invalid_type(path.to_vec(), "string", received));
            None
        }
    }
}

/// Coerced string with optional length bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringRule {
    min: Option<(usize, String)>,
    max: Option<(usize, String)>,
}

impl StringRule {
    /// A rule accepting any scalar, coerced to a string.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires at least `len` characters.
    pub fn min(mut self, len: usize, message: impl Into<String>) -> Self {
        self.min = Some((len, message.into()));
        self
    }

    /// Allows at most `len` characters.
    pub fn max(mut self, len: usize, message: impl Into<String>) -> Self {
        self.max = Some((len, message.into()));
        self
    }
}

impl Rule for StringRule {
    fn expected_type(&self) -> &'static str {
        "string"
    }

    fn check(&self, path: &[PathSegment], value: &mut Value, issues: &mut Vec<ValidationIssue>) {
        let Some(s) = coerced(path, value, issues) else {
            return;
        };
        let len = s.chars().count();
        if let Some((min, message)) = &self.min {
            if len < *min {
                issues.push(ValidationIssue::new(path.to_vec(), codes::TOO_SMALL, message.clone()));
            }
        }
        if let Some((max, message)) = &self.max {
            if len > *max {
                issues.push(ValidationIssue::new(path.to_vec(), codes::TOO_BIG, message.clone()));
            }
        }
    }
}

/// Coerced string that must match a format check.
pub struct FormatRule {
    check: fn(&str) -> bool,
    message: &'static str,
}

impl std::fmt::Debug for FormatRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRule")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl Rule for FormatRule {
    fn expected_type(&self) -> &'static str {
        "string"
    }

    fn check(&self, path: &[PathSegment], value: &mut Value, issues: &mut Vec<ValidationIssue>) {
        if let Some(s) = coerced(path, value, issues) {
            if !(self.check)(s) {
                issues.push(ValidationIssue::new(path.to_vec(), codes::INVALID_STRING, self.message));
            }
        }
    }
}

const EMAIL_PATTERN: &str = r"(?i)^[A-Z0-9_'+\-.]*[A-Z0-9_+\-]@([A-Z0-9][A-Z0-9\-]*\.)+[A-Z]{2,}$";

fn is_email(s: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    // Constant pattern, compiled in `test_email_pattern_compiles`.
    let pattern = EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("valid regex"));
    !s.starts_with('.') && !s.contains("..") && pattern.is_match(s)
}

fn is_uuid(s: &str) -> bool {
    s.len() == 36 && uuid::Uuid::try_parse(s).is_ok()
}

/// Array whose items all match a rule.
pub struct ArrayRule {
    item: Box<dyn Rule>,
}

impl Rule for ArrayRule {
    fn expected_type(&self) -> &'static str {
        "array"
    }

    fn check(&self, path: &[PathSegment], value: &mut Value, issues: &mut Vec<ValidationIssue>) {
        let Value::Array(items) = value else {
            issues.push(ValidationIssue::invalid_type(path.to_vec(), "array", type_name(value)));
            return;
        };
        for (index, item) in items.iter_mut().enumerate() {
            let mut child = path.to_vec();
            child.push(PathSegment::Index(index));
            self.item.check(&child, item, issues);
        }
    }
}

/// What an [`ObjectSchema`] does with keys it does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownKeys {
    /// Remove them from the validated fragment.
    #[default]
    Strip,
    /// Report an `unrecognized_keys` issue.
    Reject,
    /// Leave them in place.
    Keep,
}

struct Field {
    name: String,
    rule: Box<dyn Rule>,
    optional: bool,
}

/// JSON object with declared fields.
///
/// Fields are checked in declaration order, so issues come out in that
/// order too.
#[derive(Default)]
pub struct ObjectSchema {
    fields: Vec<Field>,
    unknown_keys: UnknownKeys,
}

impl ObjectSchema {
    /// An object schema without fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a required field.
    pub fn field(mut self, name: impl Into<String>, rule: impl Rule) -> Self {
        self.fields.push(Field {
            name: name.into(),
            rule: Box::new(rule),
            optional: false,
        });
        self
    }

    /// Declares a field that may be absent.
    pub fn optional(mut self, name: impl Into<String>, rule: impl Rule) -> Self {
        self.fields.push(Field {
            name: name.into(),
            rule: Box::new(rule),
            optional: true,
        });
        self
    }

    /// Reports undeclared keys instead of stripping them.
    pub fn strict(mut self) -> Self {
        self.unknown_keys = UnknownKeys::Reject;
        self
    }

    /// Keeps undeclared keys.
    pub fn passthrough(mut self) -> Self {
        self.unknown_keys = UnknownKeys::Keep;
        self
    }

    /// Returns the declared field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    fn is_declared(&self, key: &str) -> bool {
        self.fields.iter().any(|field| field.name == key)
    }
}

impl std::fmt::Debug for ObjectSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectSchema")
            .field("fields", &self.field_names().collect::<Vec<_>>())
            .field("unknown_keys", &self.unknown_keys)
            .finish()
    }
}

impl Rule for ObjectSchema {
    fn expected_type(&self) -> &'static str {
        "object"
    }

    fn check(&self, path: &[PathSegment], value: &mut Value, issues: &mut Vec<ValidationIssue>) {
        let Value::Object(map) = value else {
            issues.push(ValidationIssue::invalid_type(path.to_vec(), "object", type_name(value)));
            return;
        };

        for field in &self.fields {
            let mut child = path.to_vec();
            child.push(PathSegment::Key(field.name.clone()));
            match map.get_mut(&field.name) {
                Some(value) => field.rule.check(&child, value, issues),
                None if field.optional => {}
                None => issues.push(ValidationIssue::invalid_type(
                    child,
                    field.rule.expected_type(),
                    "undefined",
                )),
            }
        }

        match self.unknown_keys {
            UnknownKeys::Strip => map.retain(|key, _| self.is_declared(key)),
            UnknownKeys::Reject => {
                let unknown: Vec<String> = map
                    .keys()
                    .filter(|key| !self.is_declared(key))
                    .map(|key| format!("'{key}'"))
                    .collect();
                if !unknown.is_empty() {
                    issues.push(ValidationIssue::new(
                        path.to_vec(),
                        codes::UNRECOGNIZED_KEYS,
                        format!("Unrecognized key(s) in object: {}", unknown.join(", ")),
                    ));
                }
            }
            UnknownKeys::Keep => {}
        }
    }
}

/// Ready-made rules.
pub mod rules {
    use super::{is_email, is_uuid, ArrayRule, FormatRule, ObjectSchema, Rule, StringRule};

    /// Non-empty coerced string; an empty value reports `"<field> is required"`.
    pub fn string(field: &str) -> StringRule {
        StringRule::new().min(1, format!("{field} is required"))
    }

    /// Coerced string holding an email address.
    pub fn email() -> FormatRule {
        FormatRule {
            check: is_email,
            message: "Invalid email",
        }
    }

    /// Coerced string holding a hyphenated UUID.
    pub fn uuid() -> FormatRule {
        FormatRule {
            check: is_uuid,
            message: "Invalid uuid",
        }
    }

    /// Array whose items all match `item`.
    pub fn array(item: impl Rule) -> ArrayRule {
        ArrayRule {
            item: Box::new(item),
        }
    }

    /// Empty object schema.
    pub fn object() -> ObjectSchema {
        ObjectSchema::new()
    }
}
