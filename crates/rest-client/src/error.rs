//! REST client error types.

use thiserror::Error;

/// Errors that can occur during REST API calls.
///
/// None of these are retried by the client; callers try again on their next
/// scheduling cycle.
#[derive(Debug, Error)]
pub enum RestError {
    /// The request never produced an HTTP response (connect, timeout, TLS, body read).
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-200 status.
    #[error("HTTP status {code}: {body}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Raw response body.
        body: String,
    },

    /// The response body did not match the expected JSON shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Failed to build the HTTP client or request.
    #[error("Request build error: {0}")]
    RequestBuild(String),
}

impl RestError {
    /// Transport-level failure.
    pub fn is_network(&self) -> bool {
        matches!(self, RestError::Network(_))
    }

    /// Non-200 response.
    pub fn is_status(&self) -> bool {
        matches!(self, RestError::Status { .. })
    }

    /// Malformed or unexpected JSON.
    pub fn is_decode(&self) -> bool {
        matches!(self, RestError::Decode(_))
    }

    /// Status code if this is a status error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RestError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            RestError::RequestBuild(err.to_string())
        } else if err.is_decode() {
            RestError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            RestError::Status {
                code: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            RestError::Network(err.to_string())
        }
    }
}
