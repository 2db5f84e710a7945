//! Gitea API client
//!
//! Implements the repository subset of the Gitea REST API v1:
//! /api/v1/repos/{owner}/{repo}, /api/v1/orgs/{org}/repos and /api/v1/repos/migrate.

use crate::common::{repo_path, HttpClient};
use crate::error::GiteaError;
use crate::gitea_trait::GiteaClientTrait;
use crate::models::*;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Gitea API client
#[derive(Debug, Clone)]
pub struct GiteaClient {
    http: HttpClient,
}

impl GiteaClient {
    /// Create a new Gitea client
    ///
    /// # Arguments
    /// * `base_url` - Gitea base URL (e.g., "http://gitea-http.gitea:3000")
    /// * `token` - API token for authentication
    pub fn new(base_url: String, token: String) -> Result<Self, GiteaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(GiteaError::Http)?;

        Ok(Self {
            http: HttpClient::new(client, base_url, token),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Validate the API token by fetching the authenticated user.
    ///
    /// # Returns
    /// * `Ok(())` - Token is valid and Gitea is reachable
    /// * `Err(GiteaError)` - Token is invalid or Gitea is unreachable
    pub async fn validate_token(&self) -> Result<(), GiteaError> {
        debug!("Validating Gitea token and connectivity");
        let user: User = self.http.get("/api/v1/user").await?;
        debug!("Token validated successfully (user: {})", user.login);
        Ok(())
    }

    /// Get a repository by owner and name
    ///
    /// # Returns
    /// * `Ok(Some(Repository))` - The repository exists
    /// * `Ok(None)` - No such repository
    /// * `Err(GiteaError)` - If the request fails
    pub async fn get_repo(&self, owner: &str, name: &str) -> Result<Option<Repository>, GiteaError> {
        lookup_outcome(self.http.get(&repo_path(owner, name)).await)
    }

    /// Create a repository under an organization
    ///
    /// Mirrors are created through the migrate endpoint, which clones the
    /// upstream and registers the pull schedule. A 409 response means the
    /// repository already exists and is reported as `CreateOutcome::AlreadyExists`.
    pub async fn create_repo(&self, owner: &str, repo: &NewRepo) -> Result<CreateOutcome, GiteaError> {
        let result: Result<Repository, GiteaError> = if repo.mirror {
            let clone_addr = repo.clone_addr.clone().ok_or_else(|| {
                GiteaError::InvalidRequest(format!("mirror {}/{} requires a clone address", owner, repo.name))
            })?;
            let body = serde_json::to_value(MigrateRepoOptions {
                clone_addr,
                repo_name: repo.name.clone(),
                repo_owner: owner.to_string(),
                mirror: true,
                mirror_interval: repo.mirror_interval.clone(),
                description: repo.description.clone(),
                service: "git".to_string(),
            })?;
            self.http.post("/api/v1/repos/migrate", &body).await
        } else {
            let body = serde_json::to_value(CreateRepoOption {
                name: repo.name.clone(),
                description: repo.description.clone(),
                private: false,
            })?;
            self.http
                .post(&format!("/api/v1/orgs/{}/repos", urlencoding::encode(owner)), &body)
                .await
        };

        let outcome = create_outcome(result)?;
        match &outcome {
            CreateOutcome::Created(created) => {
                info!("Created repository {} in Gitea (ID: {})", created.full_name, created.id);
            }
            CreateOutcome::AlreadyExists => debug!("Repository {}/{} already exists", owner, repo.name),
        }
        Ok(outcome)
    }

    /// Update mutable repository fields
    pub async fn update_repo(&self, owner: &str, name: &str, edit: &EditRepoOption) -> Result<(), GiteaError> {
        if edit.is_empty() {
            return Ok(());
        }
        let body = serde_json::to_value(edit)?;
        let result = self.http.patch::<Repository>(&repo_path(owner, name), &body).await;
        if matches!(result, Err(GiteaError::NotFound(_))) {
            debug!("Repository {}/{} vanished before update", owner, name);
        }
        update_outcome(result)
    }

    /// Delete a repository
    pub async fn delete_repo(&self, owner: &str, name: &str) -> Result<DeleteOutcome, GiteaError> {
        delete_outcome(self.http.delete(&repo_path(owner, name)).await)
    }

    /// Trigger an immediate mirror pull
    pub async fn trigger_mirror_sync(&self, owner: &str, name: &str) -> Result<(), GiteaError> {
        self.http
            .post_empty(&format!("{}/mirror-sync", repo_path(owner, name)))
            .await
    }
}

/// A lookup answered with 404 means the repository does not exist.
fn lookup_outcome(result: Result<Repository, GiteaError>) -> Result<Option<Repository>, GiteaError> {
    match result {
        Ok(repo) => Ok(Some(repo)),
        Err(GiteaError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// A create answered with 409 is a replay of an earlier create.
fn create_outcome(result: Result<Repository, GiteaError>) -> Result<CreateOutcome, GiteaError> {
    match result {
        Ok(created) => Ok(CreateOutcome::Created(created)),
        Err(e) if e.is_conflict() => Ok(CreateOutcome::AlreadyExists),
        Err(e) => Err(e),
    }
}

/// Nothing is left to update on a repository that is gone.
fn update_outcome(result: Result<Repository, GiteaError>) -> Result<(), GiteaError> {
    match result {
        Ok(_) | Err(GiteaError::NotFound(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

fn delete_outcome(result: Result<(), GiteaError>) -> Result<DeleteOutcome, GiteaError> {
    match result {
        Ok(()) => Ok(DeleteOutcome::Deleted),
        Err(GiteaError::NotFound(_)) => Ok(DeleteOutcome::NotFound),
        Err(e) => Err(e),
    }
}

#[async_trait::async_trait]
impl GiteaClientTrait for GiteaClient {
    fn base_url(&self) -> &str {
        self.base_url()
    }

    async fn validate_token(&self) -> Result<(), GiteaError> {
        self.validate_token().await
    }

    async fn get_repo(&self, owner: &str, name: &str) -> Result<Option<Repository>, GiteaError> {
        self.get_repo(owner, name).await
    }

    async fn create_repo(&self, owner: &str, repo: &NewRepo) -> Result<CreateOutcome, GiteaError> {
        self.create_repo(owner, repo).await
    }

    async fn update_repo(&self, owner: &str, name: &str, edit: &EditRepoOption) -> Result<(), GiteaError> {
        self.update_repo(owner, name, edit).await
    }

    async fn delete_repo(&self, owner: &str, name: &str) -> Result<DeleteOutcome, GiteaError> {
        self.delete_repo(owner, name).await
    }

    async fn trigger_mirror_sync(&self, owner: &str, name: &str) -> Result<(), GiteaError> {
        self.trigger_mirror_sync(owner, name).await
    }
}
