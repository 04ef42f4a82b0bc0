//! Classification of Canvas failures into user-facing errors
//!
//! Tools never surface a [`CanvasError`] directly. They hand it to
//! [`classify`] together with a short phrase describing what they were doing,
//! and return the resulting [`ClassifiedError`] as ordinary data.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::canvas::CanvasError;

/// Category tag of a classified error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    /// Permission denied
    Unauthorized,
    /// Resource absent or inaccessible
    NotFound,
    /// Any other failure reported by Canvas
    CanvasError,
    /// The request never reached Canvas
    ConnectionError,
    /// Anything not recognized above
    UnknownError,
}

impl ErrorStatus {
    /// The tag as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStatus::Unauthorized => "unauthorized",
            ErrorStatus::NotFound => "not_found",
            ErrorStatus::CanvasError => "canvas_error",
            ErrorStatus::ConnectionError => "connection_error",
            ErrorStatus::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed operation, returned in place of its result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    /// Actionable message for the user
    pub error: String,
    /// Category tag
    pub status: ErrorStatus,
    /// The upstream error's own message, for diagnostics
    pub original_error: String,
}

impl ClassifiedError {
    /// Converts into the JSON mapping tools return
    pub fn into_value(self) -> Value {
        serde_json::json!({
            "error": self.error,
            "status": self.status.as_str(),
            "original_error": self.original_error,
        })
    }
}

impl From<ClassifiedError> for Value {
    fn from(err: ClassifiedError) -> Self {
        err.into_value()
    }
}

/// Maps a Canvas failure to a classified error
///
/// `action` completes the sentence "You don't have permission to ...", e.g.
/// "access files for course 123". The checks run in a fixed order and the
/// first match wins: permission, not found, other API errors, transport
/// failures, then everything else.
pub fn classify(err: &CanvasError, action: &str) -> ClassifiedError {
    let original_error = err.to_string();

    let (status, error) = if err.is_permission_denied() {
        (
            ErrorStatus::Unauthorized,
            format!(
                "You don't have permission to {}. This might be because you are a student and this action requires instructor privileges.",
                action
            ),
        )
    } else if err.is_not_found() {
        (
            ErrorStatus::NotFound,
            format!(
                "Could not {}: the requested resource was not found. It may not exist or you may not have access to it.",
                action
            ),
        )
    } else if err.is_api_error() {
        (ErrorStatus::CanvasError, original_error.clone())
    } else if err.is_transport() {
        (
            ErrorStatus::ConnectionError,
            format!(
                "Could not reach Canvas while trying to {}: {}",
                action, original_error
            ),
        )
    } else {
        (
            ErrorStatus::UnknownError,
            format!("Unexpected error while trying to {}: {}", action, original_error),
        )
    };

    ClassifiedError {
        error,
        status,
        original_error,
    }
}

/// Returns true if a tool result is a classified error rather than data
pub fn is_error(value: &Value) -> bool {
    value.get("error").is_some()
}
