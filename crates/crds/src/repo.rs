//! Repo CRD
//!
//! Declares a repository in a self-hosted Gitea instance, optionally mirroring
//! an upstream Git remote.

use crate::conditions::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Finalizer token owned by the repo controller.
///
/// Present on every Repo whose remote repository may exist; removed only after
/// the remote repository is confirmed gone.
pub const REPO_FINALIZER: &str = "hyperspike.io/repo-finalizer";

/// RepoSpec defines the desired state of a Gitea repository
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "hyperspike.io",
    version = "v1",
    kind = "Repo",
    namespaced,
    status = "RepoStatus",
    shortname = "repo",
    printcolumn = r#"{"name":"Org", "type":"string", "jsonPath":".spec.org.name"}, {"name":"Mirror", "type":"boolean", "jsonPath":".spec.mirror"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RepoSpec {
    /// Repository description
    #[serde(default)]
    pub description: String,

    /// Owning organization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<OrgRef>,

    /// Whether the repository mirrors an upstream remote
    #[serde(default)]
    pub mirror: bool,

    /// Upstream clone address (required when `mirror` is true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_addr: Option<String>,

    /// Mirror resync interval, e.g. "8h" (required when `mirror` is true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_interval: Option<String>,
}

/// Reference to the organization owning the repository
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrgRef {
    /// Organization name in Gitea
    pub name: String,

    /// Namespace of the Org resource this reference points back to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// RepoStatus defines the observed state of a Repo
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepoStatus {
    /// Latest observations of the repository's state
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Generation of the spec these conditions were computed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// When the controller last triggered a mirror sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_mirror_sync: Option<chrono::DateTime<chrono::Utc>>,

    /// Organization the controller manages the repository under.
    ///
    /// Recorded before the repository is created; deletion targets this
    /// organization even if `spec.org` was later changed or removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Repo {
    /// Returns true if the controller's finalizer is present.
    pub fn has_finalizer(&self) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|t| t == REPO_FINALIZER))
    }

    /// Returns true once deletion has been requested.
    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Organization recorded in status, if any.
    pub fn recorded_owner(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.owner.as_deref())
            .filter(|owner| !owner.is_empty())
    }

    /// Looks up a condition by type.
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.status
            .as_ref()
            .and_then(|s| s.conditions.iter().find(|c| c.type_ == type_))
    }
}
