//! Semantic validation of `_session` response bodies.
//!
//! A 2xx status alone does not prove the cookie belongs to the configured
//! user: a shared cookie jar or a misrouting proxy can answer successfully
//! for somebody else. The body must say `ok` and name the expected user.

use serde_json::Value;
use thiserror::Error;

/// Why a session response body was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// The body is valid JSON but not an object.
    #[error("body is not a JSON object")]
    NotAnObject,

    /// No `ok` field.
    #[error("missing `ok` field")]
    MissingOk,

    /// `ok` is present but is not the boolean `true`.
    #[error("`ok` is not true")]
    NotOk,

    /// No `userCtx` field, or it is not an object.
    #[error("missing `userCtx` object")]
    MissingUserCtx,

    /// `userCtx` has no string `name`.
    #[error("missing `userCtx.name` string")]
    MissingName,

    /// The session was issued for a different user.
    #[error("session belongs to `{actual}`, expected `{expected}`")]
    UsernameMismatch {
        /// The configured username.
        expected: String,
        /// The username the server reported.
        actual: String,
    },
}

/// Checks a parsed `_session` response body against the configured username.
///
/// Checks run in order and stop at the first failure: `ok` is `true`,
/// `userCtx` is an object, `userCtx.name` is a string, and it equals
/// `username`.
///
/// # Errors
///
/// Returns the first [`PayloadError`] encountered.
pub fn validate_session_payload(body: &Value, username: &str) -> Result<(), PayloadError> {
    let object = body.as_object().ok_or(PayloadError::NotAnObject)?;

    match object.get("ok") {
        None => return Err(PayloadError::MissingOk),
        Some(Value::Bool(true)) => {}
        Some(_) => return Err(PayloadError::NotOk),
    }

    let user_ctx = object
        .get("userCtx")
        .and_then(Value::as_object)
        .ok_or(PayloadError::MissingUserCtx)?;

    let name = user_ctx
        .get("name")
        .and_then(Value::as_str)
        .ok_or(PayloadError::MissingName)?;

    if name != username {
        return Err(PayloadError::UsernameMismatch {
            expected: username.to_string(),
            actual: name.to_string(),
        });
    }

    Ok(())
}
