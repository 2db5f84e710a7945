//! Gitea client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Gitea API
#[derive(Debug, Error)]
pub enum GiteaError {
    /// HTTP transport error (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gitea API returned a non-success status
    #[error("Gitea API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or summary
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (invalid token, insufficient scope)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GiteaError {
    /// Build an error from a non-success HTTP status.
    pub fn from_status(status: u16, context: &str, body: &str) -> Self {
        match status {
            401 | 403 => Self::Authentication(format!("{context}: {status} - {body}")),
            404 => Self::NotFound(format!("{context} - {body}")),
            _ => Self::Api {
                status,
                message: format!("{context} - {body}"),
            },
        }
    }

    /// Whether retrying the identical request may succeed.
    ///
    /// Transport failures, timeouts, throttling and 5xx responses are transient;
    /// every other rejection is deterministic.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            Self::NotFound(_)
            | Self::Serialization(_)
            | Self::Authentication(_)
            | Self::InvalidRequest(_) => false,
        }
    }

    /// Whether the error is a 409 "already exists" response.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { status: 409, .. })
    }
}
