//! Error types for talking to the hospital API.

use std::fmt;
use thiserror::Error;

/// Message shown when no response reached the client.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";

/// Fallback when an error response carries no `message` field.
pub const DEFAULT_API_ERROR_MESSAGE: &str = "An error occurred";

/// Failure of a single request or client-side submission.
///
/// `Display` is the text shown to the user in a notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request never produced a response (connection refused, timeout, DNS).
    #[error("{}", NETWORK_ERROR_MESSAGE)]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// A 2xx body that could not be mapped onto the canonical records.
    #[error("Unexpected response from server: {0}")]
    Malformed(String),

    /// Rejected by the form schema before any request was made.
    #[error("Please correct the highlighted fields ({0})")]
    Validation(FieldErrors),

    /// The API has no such operation for this resource.
    #[error("{0}")]
    Unsupported(&'static str),

    /// The HTTP client could not be constructed.
    #[error("Client configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// True when the server rejected our bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Api { status: 401, .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Malformed(err.to_string())
        } else if err.is_builder() {
            ClientError::Config(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Malformed(err.to_string())
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// A single field rejected by a form schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Field-level validation messages, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message for `field`. Only the first message per field is kept.
    pub fn push(&mut self, field: &'static str, message: &'static str) {
        if self.get(field).is_none() {
            self.0.push(FieldError { field, message });
        }
    }

    pub fn get(&self, field: &str) -> Option<&'static str> {
        self.0.iter().find(|e| e.field == field).map(|e| e.message)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.iter().map(|e| e.field).collect();
        write!(f, "{}", fields.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_server_message() {
        let err = ClientError::Api {
            status: 500,
            message: "db unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "db unavailable");
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn network_error_uses_generic_text() {
        let err = ClientError::Network("connection refused".to_string());
        assert_eq!(err.to_string(), NETWORK_ERROR_MESSAGE);
    }

    #[test]
    fn field_errors_keep_first_message_per_field() {
        let mut errors = FieldErrors::new();
        errors.push("name", "Name must be at least 2 characters");
        errors.push("name", "second message");
        errors.push("email", "Invalid email");

        assert_eq!(errors.iter().count(), 2);
        assert_eq!(errors.get("name"), Some("Name must be at least 2 characters"));
        assert_eq!(errors.to_string(), "name, email");
    }
}
