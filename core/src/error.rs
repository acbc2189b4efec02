//! Error types for the rental API client.
//!
//! # Design
//! `NotFound` and `Unauthorized` get dedicated variants because callers
//! branch on them (show "missing" vs. send the user to the login page).
//! Every other failure status lands in `Http` with the human-readable
//! message the backend put in its error body.

use serde_json::Value;
use thiserror::Error;

/// Errors returned by `RentalClient` build and parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend answered 401; the token is missing, expired or revoked.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success status, from the HTTP status line or the
    /// envelope `code`.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Map a failure status and its message to the matching variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => ApiError::Unauthorized(message),
            404 => ApiError::NotFound(message),
            _ => ApiError::Http { status, message },
        }
    }

    /// Build an error from a failed response, pulling the message out of
    /// the body.
    pub fn from_response(status: u16, body: &str) -> Self {
        Self::from_status(status, error_message(body))
    }

    /// The effective status code, when the error came from the backend.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound(_) => Some(404),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Deserialization(_) | ApiError::Serialization(_) => None,
        }
    }
}

/// Extract a human-readable message from an error body.
///
/// Looks for the envelope `message` field first, then a FastAPI-style
/// `detail` (string or list of `{msg}` objects), then falls back to the raw
/// body text.
pub fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
        match value.get("detail") {
            Some(Value::String(detail)) => return detail.clone(),
            Some(Value::Array(items)) => {
                let joined = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("; ");
                if !joined.is_empty() {
                    return joined;
                }
            }
            _ => {}
        }
    }
    if trimmed.is_empty() {
        "request failed".to_string()
    } else {
        trimmed.to_string()
    }
}
