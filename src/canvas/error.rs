//! Errors raised by the Canvas client

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Marker Canvas puts in the body of a throttled request
const RATE_LIMIT_MARKER: &str = "Rate Limit Exceeded";

/// Errors that can occur when talking to the Canvas API
#[derive(Debug, Error)]
pub enum CanvasError {
    /// The token is invalid or lacks permission (401)
    #[error("{0}")]
    Unauthorized(String),

    /// The resource does not exist or is hidden from this user (404)
    #[error("{0}")]
    ResourceDoesNotExist(String),

    /// Access to the resource is forbidden (403)
    #[error("{0}")]
    Forbidden(String),

    /// Canvas throttled the request (403 with a rate-limit body)
    #[error("{0}")]
    RateLimitExceeded(String),

    /// Canvas rejected the request as malformed (400)
    #[error("{0}")]
    BadRequest(String),

    /// The request conflicts with the resource's state (409)
    #[error("{0}")]
    Conflict(String),

    /// Canvas could not process the request (422)
    #[error("{0}")]
    UnprocessableEntity(String),

    /// Any other non-success status
    #[error("API returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl CanvasError {
    /// Maps a non-success HTTP status and its body to an error variant
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = error_message(status, body);
        match status.as_u16() {
            400 => CanvasError::BadRequest(message),
            401 => CanvasError::Unauthorized(message),
            403 if body.contains(RATE_LIMIT_MARKER) => CanvasError::RateLimitExceeded(message),
            403 => CanvasError::Forbidden(message),
            404 => CanvasError::ResourceDoesNotExist(message),
            409 => CanvasError::Conflict(message),
            422 => CanvasError::UnprocessableEntity(message),
            code => CanvasError::Api {
                status: code,
                message,
            },
        }
    }

    /// Returns true for permission failures
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, CanvasError::Unauthorized(_))
    }

    /// Returns true when the resource is absent or inaccessible
    pub fn is_not_found(&self) -> bool {
        matches!(self, CanvasError::ResourceDoesNotExist(_))
    }

    /// Returns true for every error Canvas itself reported
    pub fn is_api_error(&self) -> bool {
        matches!(
            self,
            CanvasError::Unauthorized(_)
                | CanvasError::ResourceDoesNotExist(_)
                | CanvasError::Forbidden(_)
                | CanvasError::RateLimitExceeded(_)
                | CanvasError::BadRequest(_)
                | CanvasError::Conflict(_)
                | CanvasError::UnprocessableEntity(_)
                | CanvasError::Api { .. }
        )
    }

    /// Returns true when the request never got a response
    pub fn is_transport(&self) -> bool {
        matches!(self, CanvasError::RequestFailed(_))
    }
}

/// Pulls a human-readable message out of a Canvas error body
///
/// Canvas answers with `{"errors": [{"message": ...}]}`, `{"errors": {...}}`
/// or `{"message": ...}` depending on the endpoint. Falls back to the raw body
/// and finally to the status reason, so the result is never empty.
fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json_message(&json));
    if let Some(message) = from_json {
        return message;
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

fn json_message(json: &Value) -> Option<String> {
    let messages: Vec<&str> = match json.get("errors") {
        Some(Value::Array(errors)) => errors
            .iter()
            .filter_map(|e| e.get("message").and_then(Value::as_str).or_else(|| e.as_str()))
            .collect(),
        Some(Value::Object(errors)) => errors
            .values()
            .filter_map(|e| e.get("message").and_then(Value::as_str).or_else(|| e.as_str()))
            .collect(),
        Some(Value::String(error)) => vec![error.as_str()],
        _ => json
            .get("message")
            .and_then(Value::as_str)
            .into_iter()
            .collect(),
    };

    let joined = messages
        .into_iter()
        .filter(|m| !m.trim().is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    (!joined.is_empty()).then_some(joined)
}
