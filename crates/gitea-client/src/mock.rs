//! Mock GiteaClient for unit testing
//!
//! This module provides a mock implementation of GiteaClientTrait that can be used
//! in unit tests without requiring a running Gitea instance.

use crate::error::GiteaError;
use crate::gitea_trait::GiteaClientTrait;
use crate::models::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Operations the mock counts and can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Get,
    Create,
    Update,
    Delete,
    MirrorSync,
}

/// Failure injected into a mocked operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// 503 Service Unavailable
    Transient,
    /// 422 Unprocessable Entity
    Permanent,
    /// 401 Unauthorized
    Unauthorized,
}

impl InjectedFailure {
    fn to_error(self, op: MockOperation) -> GiteaError {
        let context = format!("mock {:?}", op);
        match self {
            Self::Transient => GiteaError::from_status(503, &context, "service unavailable"),
            Self::Permanent => GiteaError::from_status(422, &context, "unprocessable entity"),
            Self::Unauthorized => GiteaError::from_status(401, &context, "token rejected"),
        }
    }
}

/// Mock GiteaClient for testing
///
/// Repositories live in memory keyed by `(owner, name)`. Every call is counted
/// per operation, and failures can be injected for a number of calls or
/// indefinitely.
#[derive(Clone)]
pub struct MockGiteaClient {
    base_url: String,
    repos: Arc<Mutex<HashMap<(String, String), Repository>>>,
    calls: Arc<Mutex<HashMap<MockOperation, usize>>>,
    // Remaining count of `None` fails forever
    failures: Arc<Mutex<HashMap<MockOperation, (InjectedFailure, Option<usize>)>>>,
    edits: Arc<Mutex<Vec<(String, String, EditRepoOption)>>>,
    latency: Arc<Mutex<Option<Duration>>>,
    next_id: Arc<Mutex<u64>>,
}

impl MockGiteaClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            repos: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            edits: Arc::new(Mutex::new(Vec::new())),
            latency: Arc::new(Mutex::new(None)),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Add a repository to the mock store (for test setup)
    pub fn add_repo(&self, owner: &str, repo: Repository) {
        self.repos
            .lock()
            .unwrap()
            .insert((owner.to_string(), repo.name.clone()), repo);
    }

    /// Build and store a plain repository (for test setup)
    pub fn seed_repo(&self, owner: &str, name: &str, description: &str) -> Repository {
        let repo = self.build_repo(owner, name, description);
        self.add_repo(owner, repo.clone());
        repo
    }

    /// Current state of a repository
    pub fn repo(&self, owner: &str, name: &str) -> Option<Repository> {
        self.repos
            .lock()
            .unwrap()
            .get(&(owner.to_string(), name.to_string()))
            .cloned()
    }

    /// Number of stored repositories
    pub fn repo_count(&self) -> usize {
        self.repos.lock().unwrap().len()
    }

    /// Number of calls made to `op`, including failed ones
    pub fn call_count(&self, op: MockOperation) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    /// Number of calls that could have changed remote state
    pub fn mutation_count(&self) -> usize {
        [
            MockOperation::Create,
            MockOperation::Update,
            MockOperation::Delete,
            MockOperation::MirrorSync,
        ]
        .iter()
        .map(|op| self.call_count(*op))
        .sum()
    }

    /// Edits received by `update_repo`, in call order
    pub fn edits(&self) -> Vec<(String, String, EditRepoOption)> {
        self.edits.lock().unwrap().clone()
    }

    /// Reset call counters and recorded edits
    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
        self.edits.lock().unwrap().clear();
    }

    /// Fail the next `times` calls to `op`
    pub fn fail_next(&self, op: MockOperation, failure: InjectedFailure, times: usize) {
        self.failures.lock().unwrap().insert(op, (failure, Some(times)));
    }

    /// Fail every call to `op` until cleared
    pub fn fail_always(&self, op: MockOperation, failure: InjectedFailure) {
        self.failures.lock().unwrap().insert(op, (failure, None));
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Delay every repository call by `latency` before it takes effect
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    async fn record(&self, op: MockOperation) -> Result<(), GiteaError> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;

        let mut failures = self.failures.lock().unwrap();
        let Some((failure, remaining)) = failures.get_mut(&op) else {
            return Ok(());
        };
        let failure = *failure;
        match remaining {
            None => Err(failure.to_error(op)),
            Some(0) => {
                failures.remove(&op);
                Ok(())
            }
            Some(n) => {
                *n -= 1;
                if *n == 0 {
                    failures.remove(&op);
                }
                Err(failure.to_error(op))
            }
        }
    }

    fn build_repo(&self, owner: &str, name: &str, description: &str) -> Repository {
        let mut next_id = self.next_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;

        let now = chrono::Utc::now();
        Repository {
            id,
            name: name.to_string(),
            full_name: format!("{}/{}", owner, name),
            owner: Some(User {
                id: 1,
                login: owner.to_string(),
            }),
            description: description.to_string(),
            private: false,
            mirror: false,
            mirror_interval: String::new(),
            mirror_updated: None,
            original_url: String::new(),
            html_url: format!("{}/{}/{}", self.base_url, owner, name),
            clone_url: format!("{}/{}/{}.git", self.base_url, owner, name),
            empty: true,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

#[async_trait::async_trait]
impl GiteaClientTrait for MockGiteaClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn validate_token(&self) -> Result<(), GiteaError> {
        Ok(())
    }

    async fn get_repo(&self, owner: &str, name: &str) -> Result<Option<Repository>, GiteaError> {
        self.record(MockOperation::Get).await?;
        Ok(self.repo(owner, name))
    }

    async fn create_repo(&self, owner: &str, new: &NewRepo) -> Result<CreateOutcome, GiteaError> {
        self.record(MockOperation::Create).await?;

        if self.repo(owner, &new.name).is_some() {
            return Ok(CreateOutcome::AlreadyExists);
        }

        let mut repo = self.build_repo(owner, &new.name, &new.description);
        if new.mirror {
            let clone_addr = new.clone_addr.clone().ok_or_else(|| {
                GiteaError::InvalidRequest(format!("mirror {}/{} requires a clone address", owner, new.name))
            })?;
            repo.mirror = true;
            repo.original_url = clone_addr;
            repo.mirror_interval = new
                .mirror_interval
                .clone()
                .unwrap_or_else(|| "8h0m0s".to_string());
            repo.empty = false;
        }

        self.add_repo(owner, repo.clone());
        Ok(CreateOutcome::Created(repo))
    }

    async fn update_repo(&self, owner: &str, name: &str, edit: &EditRepoOption) -> Result<(), GiteaError> {
        self.record(MockOperation::Update).await?;
        self.edits
            .lock()
            .unwrap()
            .push((owner.to_string(), name.to_string(), edit.clone()));

        let mut repos = self.repos.lock().unwrap();
        if let Some(repo) = repos.get_mut(&(owner.to_string(), name.to_string())) {
            if let Some(description) = &edit.description {
                repo.description = description.clone();
            }
            if let Some(interval) = &edit.mirror_interval {
                repo.mirror_interval = interval.clone();
            }
            repo.updated_at = Some(chrono::Utc::now());
        }
        Ok(())
    }

    async fn delete_repo(&self, owner: &str, name: &str) -> Result<DeleteOutcome, GiteaError> {
        self.record(MockOperation::Delete).await?;
        match self
            .repos
            .lock()
            .unwrap()
            .remove(&(owner.to_string(), name.to_string()))
        {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::NotFound),
        }
    }

    async fn trigger_mirror_sync(&self, owner: &str, name: &str) -> Result<(), GiteaError> {
        self.record(MockOperation::MirrorSync).await?;
        // Gitea schedules the pull asynchronously; mirror_updated is left alone
        match self.repo(owner, name) {
            Some(repo) if repo.mirror => Ok(()),
            Some(_) => Err(GiteaError::from_status(400, "mirror-sync", "repository is not a mirror")),
            None => Err(GiteaError::NotFound(format!("{}/{}", owner, name))),
        }
    }
}
