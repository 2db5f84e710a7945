//! Repo object store.
//!
//! The reconciler reads and writes Repo objects only through `RepoStore`.
//! Writes carry the object's `resourceVersion` as a precondition, so a write
//! based on a stale read fails with `StoreError::Conflict` instead of
//! overwriting a newer object.

use crds::{Repo, RepoStatus};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use std::fmt;
use thiserror::Error;

/// Errors from reading or writing Repo objects
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write was based on a stale resource version
    #[error("write to {0} conflicts with a newer version")]
    Conflict(String),

    /// The object no longer exists
    #[error("{0} not found")]
    NotFound(String),

    /// The object is missing metadata required for the operation
    #[error("object is missing {0}")]
    Incomplete(String),

    /// Any other Kubernetes API failure
    #[error("Kubernetes API error: {0}")]
    Kube(#[source] kube::Error),
}

/// Namespace + name identifying a Repo
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an existing Repo object.
    pub fn for_repo(repo: &Repo) -> Result<Self, StoreError> {
        let namespace = repo
            .namespace()
            .ok_or_else(|| StoreError::Incomplete("metadata.namespace".to_string()))?;
        let name = repo
            .metadata
            .name
            .clone()
            .ok_or_else(|| StoreError::Incomplete("metadata.name".to_string()))?;
        Ok(Self::new(namespace, name))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Read/write access to Repo objects with optimistic concurrency
#[async_trait::async_trait]
pub trait RepoStore: Send + Sync {
    /// Fetch the current object; `Ok(None)` when it does not exist.
    async fn get(&self, key: &ObjectKey) -> Result<Option<Repo>, StoreError>;

    /// Replace the finalizer list of `repo`, returning the updated object.
    async fn set_finalizers(&self, repo: &Repo, finalizers: Vec<String>) -> Result<Repo, StoreError>;

    /// Replace the status of `repo`, returning the updated object.
    async fn write_status(&self, repo: &Repo, status: &RepoStatus) -> Result<Repo, StoreError>;
}

/// `RepoStore` backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeRepoStore {
    client: Client,
}

impl KubeRepoStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Repo> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn resource_version(repo: &Repo) -> Result<String, StoreError> {
    repo.resource_version()
        .ok_or_else(|| StoreError::Incomplete("metadata.resourceVersion".to_string()))
}

fn map_kube_error(key: &ObjectKey, error: kube::Error) -> StoreError {
    match error {
        kube::Error::Api(api_err) if api_err.code == 409 => StoreError::Conflict(key.to_string()),
        kube::Error::Api(api_err) if api_err.code == 404 => StoreError::NotFound(key.to_string()),
        other => StoreError::Kube(other),
    }
}

#[async_trait::async_trait]
impl RepoStore for KubeRepoStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<Repo>, StoreError> {
        self.api(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|e| map_kube_error(key, e))
    }

    async fn set_finalizers(&self, repo: &Repo, finalizers: Vec<String>) -> Result<Repo, StoreError> {
        let key = ObjectKey::for_repo(repo)?;
        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": resource_version(repo)?,
                "finalizers": finalizers,
            }
        });
        self.api(&key.namespace)
            .patch(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| map_kube_error(&key, e))
    }

    async fn write_status(&self, repo: &Repo, status: &RepoStatus) -> Result<Repo, StoreError> {
        let key = ObjectKey::for_repo(repo)?;
        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": resource_version(repo)?,
            },
            "status": status,
        });
        self.api(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| map_kube_error(&key, e))
    }
}
