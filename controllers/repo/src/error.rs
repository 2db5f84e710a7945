//! Controller-specific error types.
//!
//! Every failure a reconciliation pass can produce is a `ControllerError`, and
//! every `ControllerError` maps onto one `ErrorClass`. The class decides the
//! condition reason written to status and the requeue directive.

use crate::store::StoreError;
use gitea_client::GiteaError;
use thiserror::Error;

/// Errors that can occur in the repo controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Gitea API error
    #[error("Gitea error: {0}")]
    Gitea(#[from] GiteaError),

    /// Reading or writing the Repo object failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The declared spec cannot be acted on
    #[error("Invalid spec: {0}")]
    InvalidSpec(String),

    /// Gitea cannot converge to the declared spec
    #[error("Rejected by Gitea: {0}")]
    Rejected(String),

    /// The pass ran out of time before an outbound call returned
    #[error("Reconciliation deadline exceeded")]
    DeadlineExceeded,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Retry classification of a `ControllerError`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed spec; not retried until the spec changes
    Validation,
    /// Stale write against the Repo object; retried immediately
    Conflict,
    /// Gitea or the cluster API unreachable or overloaded; exponential backoff
    Transient,
    /// Gitea rejects the request deterministically; capped long backoff
    Permanent,
}

impl ControllerError {
    /// Classify the error for status reporting and requeue.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidSpec(_) => ErrorClass::Validation,
            Self::Store(StoreError::Conflict(_)) => ErrorClass::Conflict,
            Self::Store(_) | Self::DeadlineExceeded => ErrorClass::Transient,
            Self::Gitea(e) if e.is_transient() => ErrorClass::Transient,
            Self::Gitea(_) | Self::Rejected(_) | Self::InvalidConfig(_) => ErrorClass::Permanent,
        }
    }
}
