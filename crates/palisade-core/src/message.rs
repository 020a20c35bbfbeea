//! Canonical response messages.
//!
//! Success statuses all map to `"Success"`; error statuses map to their
//! reason phrase. [`VALIDATION_ERROR`] and [`SOMETHING_WENT_WRONG`] are the
//! fixed messages used by the default error formatter.

use http::StatusCode;

/// 200 OK.
pub const OK: &str = "Success";
/// 201 Created.
pub const CREATED: &str = "Success";
/// 202 Accepted.
pub const ACCEPTED: &str = "Success";
/// 204 No Content.
pub const NO_CONTENT: &str = "Success";
/// 301 Moved Permanently.
pub const MOVED_PERMANENTLY: &str = "Success";
/// 302 Found.
pub const FOUND: &str = "Success";
/// 304 Not Modified.
pub const NOT_MODIFIED: &str = "Success";

/// 400 Bad Request.
pub const BAD_REQUEST: &str = "Bad Request";
/// 401 Unauthorized.
pub const UNAUTHORIZED: &str = "Unauthorized";
/// 403 Forbidden.
pub const FORBIDDEN: &str = "Forbidden";
/// 404 Not Found.
pub const NOT_FOUND: &str = "Not Found";
/// 405 Method Not Allowed.
pub const METHOD_NOT_ALLOWED: &str = "Method Not Allowed";
/// 406 Not Acceptable.
pub const NOT_ACCEPTABLE: &str = "Not Acceptable";
/// 409 Conflict.
pub const CONFLICT: &str = "Conflict";
/// 422 Unprocessable Entity.
pub const UNPROCESSABLE_ENTITY: &str = "Unprocessable Entity";
/// 429 Too Many Requests.
pub const TOO_MANY_REQUESTS: &str = "Too Many Requests";

/// 500 Internal Server Error.
pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";
/// 501 Not Implemented.
pub const NOT_IMPLEMENTED: &str = "Not Implemented";
/// 502 Bad Gateway.
pub const BAD_GATEWAY: &str = "Bad Gateway";
/// 503 Service Unavailable.
pub const SERVICE_UNAVAILABLE: &str = "Service Unavailable";
/// 504 Gateway Timeout.
pub const GATEWAY_TIMEOUT: &str = "Gateway Timeout";

/// Message for schema validation failures.
pub const VALIDATION_ERROR: &str = "Validation error";
/// Generic message returned for unrecognized failures.
pub const SOMETHING_WENT_WRONG: &str = "Something went wrong";

/// Returns the canonical message for a status code.
///
/// Unlisted statuses fall back to the status' canonical reason phrase.
///
/// # Example
///
/// ```
/// use palisade_core::message;
/// use http::StatusCode;
///
/// assert_eq!(message::for_status(StatusCode::CREATED), "Success");
/// assert_eq!(message::for_status(StatusCode::FORBIDDEN), "Forbidden");
/// assert_eq!(message::for_status(StatusCode::IM_A_TEAPOT), "I'm a teapot");
/// ```
#[must_use]
pub fn for_status(status: StatusCode) -> &'static str {
    match status.as_u16() {
        200 => OK,
        201 => CREATED,
        202 => ACCEPTED,
        204 => NO_CONTENT,
        301 => MOVED_PERMANENTLY,
        302 => FOUND,
        304 => NOT_MODIFIED,
        400 => BAD_REQUEST,
        401 => UNAUTHORIZED,
        403 => FORBIDDEN,
        404 => NOT_FOUND,
        405 => METHOD_NOT_ALLOWED,
        406 => NOT_ACCEPTABLE,
        409 => CONFLICT,
        422 => UNPROCESSABLE_ENTITY,
        429 => TOO_MANY_REQUESTS,
        500 => INTERNAL_SERVER_ERROR,
        501 => NOT_IMPLEMENTED,
        502 => BAD_GATEWAY,
        503 => SERVICE_UNAVAILABLE,
        504 => GATEWAY_TIMEOUT,
        _ => status.canonical_reason().unwrap_or("Unknown"),
    }
}
