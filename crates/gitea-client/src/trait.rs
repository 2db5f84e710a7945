//! GiteaClient trait for mocking
//!
//! This trait abstracts the GiteaClient so the reconciler can be driven by a
//! mock implementation in unit tests.

use crate::error::GiteaError;
use crate::models::*;

/// Repository operations against a Gitea instance, keyed by owner + name.
///
/// Every operation is idempotent: creating an existing repository, updating or
/// deleting a missing one all complete without error so a partially applied
/// reconciliation can be replayed. Implementations hold no per-call state and
/// are shared across concurrent reconciliations.
#[async_trait::async_trait]
pub trait GiteaClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Validate the API token
    async fn validate_token(&self) -> Result<(), GiteaError>;

    /// Fetch a repository; `Ok(None)` when it does not exist.
    async fn get_repo(&self, owner: &str, name: &str) -> Result<Option<Repository>, GiteaError>;

    /// Create a repository, or migrate it as a mirror when `repo.mirror` is set.
    async fn create_repo(&self, owner: &str, repo: &NewRepo) -> Result<CreateOutcome, GiteaError>;

    /// Apply the fields set in `edit`; a missing repository is not an error.
    async fn update_repo(&self, owner: &str, name: &str, edit: &EditRepoOption) -> Result<(), GiteaError>;

    /// Delete a repository.
    async fn delete_repo(&self, owner: &str, name: &str) -> Result<DeleteOutcome, GiteaError>;

    /// Ask Gitea to pull the mirror from its upstream now.
    async fn trigger_mirror_sync(&self, owner: &str, name: &str) -> Result<(), GiteaError>;
}
