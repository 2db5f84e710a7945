//! Status conditions
//!
//! Kubernetes-style conditions reported on Repo status, plus the condition
//! types and reason codes the repo controller emits.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type: the repository is converged with its declaration
pub const CONDITION_READY: &str = "Ready";
/// Condition type: the mirror is up to date with its upstream
pub const CONDITION_SYNCED: &str = "Synced";

/// Reason codes carried by Repo conditions
pub mod reasons {
    /// Remote repository matches the declaration
    pub const RECONCILED: &str = "Reconciled";
    /// Reconciliation is in progress (e.g. finalizer just added)
    pub const RECONCILING: &str = "Reconciling";
    /// A mirror sync was triggered on this pass
    pub const MIRROR_SYNC_TRIGGERED: &str = "MirrorSyncTriggered";
    /// Mirror sync is not yet due
    pub const MIRROR_UP_TO_DATE: &str = "MirrorUpToDate";
    /// Repository is not a mirror
    pub const NOT_MIRROR: &str = "NotMirror";
    /// The declared spec is invalid
    pub const INVALID_SPEC: &str = "InvalidSpec";
    /// The Git service deterministically rejected the request
    pub const REJECTED_BY_SERVICE: &str = "RejectedByService";
    /// The Git service or cluster API failed transiently
    pub const TEMPORARY_ERROR: &str = "TemporaryError";
    /// A write raced a newer version of the Repo object
    pub const CONFLICT: &str = "Conflict";
    /// Deletion of the remote repository is in progress
    pub const DELETING: &str = "Deleting";
}

/// Condition represents one observation of a Repo's state
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition ("Ready", "Synced")
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition ("True" or "False")
    pub status: String,

    /// Machine-readable reason for the last transition
    pub reason: String,

    /// Human-readable message
    #[serde(default)]
    pub message: String,

    /// Last time the status flipped
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a condition stamped with the given transition time.
    pub fn new(
        type_: &str,
        status: bool,
        reason: &str,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            type_: type_.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            reason: reason.to_string(),
            message: message.into(),
            last_transition_time: now,
        }
    }

    /// Whether the condition status is "True".
    pub fn is_true(&self) -> bool {
        self.status == "True"
    }

    /// Same observation, ignoring the transition timestamp.
    pub fn same_observation(&self, other: &Condition) -> bool {
        self.type_ == other.type_
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}
