//! Gitea API models
//!
//! These models match the Gitea REST API v1 structs.
//! See: modules/structs/repo.go in the Gitea source tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository model matching Gitea's `Repository` struct
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: Option<User>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub mirror: bool,
    /// Go duration string, e.g. "8h0m0s"
    #[serde(default)]
    pub mirror_interval: String,
    /// Last time the mirror pulled from its upstream
    #[serde(default)]
    pub mirror_updated: Option<DateTime<Utc>>,
    /// Upstream address for mirrors
    #[serde(default)]
    pub original_url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub clone_url: String,
    #[serde(default)]
    pub empty: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// User/organization summary embedded in other models
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub login: String,
}

/// Body for `POST /api/v1/orgs/{org}/repos`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRepoOption {
    pub name: String,
    pub description: String,
    pub private: bool,
}

/// Body for `POST /api/v1/repos/migrate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateRepoOptions {
    pub clone_addr: String,
    pub repo_name: String,
    pub repo_owner: String,
    pub mirror: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_interval: Option<String>,
    pub description: String,
    pub service: String,
}

/// Body for `PATCH /api/v1/repos/{owner}/{repo}`
///
/// Only fields that are `Some` are sent; Gitea leaves the rest unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EditRepoOption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_interval: Option<String>,
}

impl EditRepoOption {
    /// True when the edit would not change anything.
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.mirror_interval.is_none()
    }
}

/// Desired attributes for a repository to be created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRepo {
    pub name: String,
    pub description: String,
    pub mirror: bool,
    pub clone_addr: Option<String>,
    pub mirror_interval: Option<String>,
}

/// Result of a create call
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// The repository was created by this call
    Created(Repository),
    /// The repository already existed (replayed create)
    AlreadyExists,
}

/// Result of a delete call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The repository was deleted by this call
    Deleted,
    /// The repository was already gone
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_deserializes_gitea_payload() {
        let repo: Repository = serde_json::from_value(serde_json::json!({
            "id": 42,
            "name": "test-resource",
            "full_name": "test-org/test-resource",
            "owner": { "id": 3, "login": "test-org" },
            "description": "A test mirror repo",
            "private": false,
            "mirror": true,
            "mirror_interval": "8h0m0s",
            "mirror_updated": "2024-06-01T12:00:00Z",
            "original_url": "https://github.com/test/test.git",
            "html_url": "http://gitea/test-org/test-resource",
            "clone_url": "http://gitea/test-org/test-resource.git",
            "empty": false,
            "created_at": "2024-06-01T11:00:00Z",
            "updated_at": "2024-06-01T12:00:00Z",
            "permissions": { "admin": true }
        }))
        .unwrap();

        assert_eq!(repo.full_name, "test-org/test-resource");
        assert!(repo.mirror);
        assert_eq!(repo.mirror_interval, "8h0m0s");
        assert!(repo.mirror_updated.is_some());
    }

    #[test]
    fn test_edit_option_skips_unset_fields() {
        let edit = EditRepoOption {
            description: Some("new".to_string()),
            mirror_interval: None,
        };
        let value = serde_json::to_value(&edit).unwrap();
        assert_eq!(value, serde_json::json!({ "description": "new" }));
        assert!(!edit.is_empty());
        assert!(EditRepoOption::default().is_empty());
    }
}
