//! Success envelope.
//!
//! Successful handler results are wrapped as
//! `{"status": <code>, "success": true, "message": <text>, ...data}` and sent
//! with the matching HTTP status.

use crate::types::{Response, ResponseExt};
use http::StatusCode;
use palisade_core::message;
use serde_json::{Map, Value};

const STATUS_CODE_KEY: &str = "statusCode";
const RESERVED: [&str; 3] = ["status", "success", "message"];

/// Builds a success response from a payload object.
///
/// `statusCode` (default 200) and `message` (default `"Success"`) are taken
/// out of the payload; every other field is copied into the envelope, except
/// `status` and `success`, which are never overridden. A payload that is not
/// an object is placed under `data`.
///
/// # Example
///
/// ```
/// use palisade_middleware::send_response;
/// use http::StatusCode;
/// use serde_json::json;
///
/// let response = send_response(json!({"statusCode": 201, "message": "Created", "id": 5}));
/// assert_eq!(response.status(), StatusCode::CREATED);
/// ```
pub fn send_response(payload: Value) -> Response {
    let mut envelope = SuccessResponse::new();
    match payload {
        Value::Object(mut map) => {
            if let Some(code) = map.remove(STATUS_CODE_KEY) {
                envelope = envelope.status_value(&code);
            }
            if let Some(text) = map.remove("message") {
                envelope = envelope.message_value(text);
            }
            for (key, value) in map {
                envelope = envelope.field(key, value);
            }
        }
        Value::Null => {}
        other => envelope = envelope.field("data", other),
    }
    envelope.into_response()
}

/// Builder for the success envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessResponse {
    status: StatusCode,
    message: Value,
    data: Map<String, Value>,
}

impl Default for SuccessResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl SuccessResponse {
    /// Creates `200 Success` with no data.
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            message: Value::from(message::OK),
            data: Map::new(),
        }
    }

    /// Sets the HTTP status.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets the message.
    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.message = Value::String(text.into());
        self
    }

    /// Adds a data field. `status`, `success` and `message` are ignored.
    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if RESERVED.contains(&key.as_str()) {
            tracing::debug!(key = %key, "Ignoring reserved envelope key");
        } else {
            self.data.insert(key, value);
        }
        self
    }

    fn status_value(self, code: &Value) -> Self {
        let status = code
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .and_then(|n| StatusCode::from_u16(n).ok());
        match status {
            Some(status) => self.status(status),
            None => {
                tracing::warn!(status_code = %code, "Invalid statusCode in response payload, using 200");
                self
            }
        }
    }

    fn message_value(mut self, text: Value) -> Self {
        if !text.is_null() {
            self.message = text;
        }
        self
    }

    /// Renders the envelope body.
    pub fn to_json(&self) -> Value {
        let mut body = Map::with_capacity(self.data.len() + 3);
        body.insert("status".to_string(), Value::from(self.status.as_u16()));
        body.insert("success".to_string(), Value::Bool(true));
        body.insert("message".to_string(), self.message.clone());
        body.extend(self.data.clone());
        Value::Object(body)
    }

    /// Builds the JSON response.
    pub fn into_response(self) -> Response {
        Response::json(self.status, &self.to_json())
    }
}
