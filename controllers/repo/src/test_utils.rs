//! Test utilities for unit testing the reconciler
//!
//! This module provides helpers for creating test data, an in-memory Repo
//! store with resource versions and conflict injection, and a ready-made
//! reconciler wired to a `MockGiteaClient`.

use crate::reconciler::Reconciler;
use crate::scheduler::RequeuePolicy;
use crate::store::{ObjectKey, RepoStore, StoreError};
use crds::{OrgRef, Repo, RepoSpec, RepoStatus, REPO_FINALIZER};
use gitea_client::{MockGiteaClient, Repository, User};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Helper to create a test Repo CRD at generation 1
pub fn create_test_repo(name: &str, namespace: &str, spec: RepoSpec) -> Repo {
    Repo {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            generation: Some(1),
            ..Default::default()
        },
        spec,
        status: None,
    }
}

/// Helper to create a test Repo as left by the finalizer pass: finalizer
/// present and the declared organization recorded as owner
pub fn create_finalized_repo(name: &str, namespace: &str, spec: RepoSpec) -> Repo {
    let owner = spec.org.as_ref().map(|org| org.name.clone());
    let mut repo = create_test_repo(name, namespace, spec);
    repo.metadata.finalizers = Some(vec![REPO_FINALIZER.to_string()]);
    repo.status = owner.map(|owner| RepoStatus {
        owner: Some(owner),
        ..Default::default()
    });
    repo
}

/// Spec for a plain (non-mirror) repository
pub fn plain_spec(org: &str, description: &str) -> RepoSpec {
    RepoSpec {
        description: description.to_string(),
        org: Some(OrgRef {
            name: org.to_string(),
            namespace: None,
        }),
        mirror: false,
        clone_addr: None,
        mirror_interval: None,
    }
}

/// Spec for a mirror repository
pub fn mirror_spec(org: &str, clone_addr: &str, interval: &str) -> RepoSpec {
    RepoSpec {
        description: "A test mirror repo".to_string(),
        org: Some(OrgRef {
            name: org.to_string(),
            namespace: None,
        }),
        mirror: true,
        clone_addr: Some(clone_addr.to_string()),
        mirror_interval: Some(interval.to_string()),
    }
}

/// Helper to create a Gitea repository as returned by the API
pub fn remote_repo(owner: &str, name: &str, description: &str) -> Repository {
    Repository {
        id: 1,
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
        html_url: format!("http://gitea.test/{}/{}", owner, name),
        clone_url: format!("http://gitea.test/{}/{}.git", owner, name),
        empty: false,
        created_at: None,
        updated_at: None,
    }
}

/// Helper to create a Gitea mirror repository as returned by the API
pub fn remote_mirror(
    owner: &str,
    name: &str,
    spec: &RepoSpec,
    mirror_interval: &str,
    mirror_updated: Option<chrono::DateTime<chrono::Utc>>,
) -> Repository {
    let mut repo = remote_repo(owner, name, &spec.description);
    repo.mirror = true;
    repo.mirror_interval = mirror_interval.to_string();
    repo.mirror_updated = mirror_updated;
    repo.original_url = spec.clone_addr.clone().unwrap_or_default();
    repo
}

/// Kind of write accepted by `InMemoryRepoStore`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreWrite {
    Finalizers,
    Status,
}

#[derive(Default)]
struct StoreState {
    objects: HashMap<ObjectKey, Repo>,
    version: u64,
    conflicts: HashMap<StoreWrite, u32>,
    status_writes: usize,
    finalizer_writes: usize,
    rejected_writes: usize,
}

impl StoreState {
    fn bump(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }
}

/// In-memory `RepoStore` with resource versions
///
/// Every accepted write bumps the object's resource version. A write whose
/// resource version is stale is rejected with `StoreError::Conflict`. Removing
/// the last finalizer from an object marked for deletion removes the object,
/// like the API server's garbage collection.
#[derive(Clone, Default)]
pub struct InMemoryRepoStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryRepoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `repo`, assigning a fresh resource version
    pub fn insert(&self, mut repo: Repo) -> Repo {
        let mut state = self.state.lock().unwrap();
        repo.metadata.resource_version = Some(state.bump());
        let key = ObjectKey::for_repo(&repo).unwrap();
        state.objects.insert(key, repo.clone());
        repo
    }

    /// Current stored object
    pub fn repo(&self, key: &ObjectKey) -> Option<Repo> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }

    /// Simulate `kubectl delete`: set the deletion timestamp
    pub fn mark_for_deletion(&self, key: &ObjectKey) {
        let mut state = self.state.lock().unwrap();
        let version = state.bump();
        let repo = state.objects.get_mut(key).unwrap();
        repo.metadata.deletion_timestamp =
            Some(serde_json::from_value(serde_json::json!("2024-06-01T12:00:00Z")).unwrap());
        repo.metadata.resource_version = Some(version);
    }

    /// Simulate a user editing the spec: bumps generation and version
    pub fn edit_spec(&self, key: &ObjectKey, edit: impl FnOnce(&mut RepoSpec)) {
        let mut state = self.state.lock().unwrap();
        let version = state.bump();
        let repo = state.objects.get_mut(key).unwrap();
        edit(&mut repo.spec);
        repo.metadata.generation = Some(repo.metadata.generation.unwrap_or(0) + 1);
        repo.metadata.resource_version = Some(version);
    }

    /// Reject the next `times` writes of `kind` as if another writer got there first
    pub fn inject_conflicts(&self, kind: StoreWrite, times: u32) {
        self.state.lock().unwrap().conflicts.insert(kind, times);
    }

    pub fn status_writes(&self) -> usize {
        self.state.lock().unwrap().status_writes
    }

    pub fn finalizer_writes(&self) -> usize {
        self.state.lock().unwrap().finalizer_writes
    }

    pub fn rejected_writes(&self) -> usize {
        self.state.lock().unwrap().rejected_writes
    }

    fn write(&self, repo: &Repo, kind: StoreWrite, apply: impl FnOnce(&mut Repo)) -> Result<Repo, StoreError> {
        let key = ObjectKey::for_repo(repo)?;
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;

        let inject = match state.conflicts.get_mut(&kind) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };
        if inject {
            // A concurrent writer moved the object on
            let version = state.bump();
            if let Some(stored) = state.objects.get_mut(&key) {
                stored.metadata.resource_version = Some(version);
            }
            state.rejected_writes += 1;
            return Err(StoreError::Conflict(key.to_string()));
        }

        let Some(stored) = state.objects.get(&key) else {
            return Err(StoreError::NotFound(key.to_string()));
        };
        if stored.metadata.resource_version != repo.metadata.resource_version {
            state.rejected_writes += 1;
            return Err(StoreError::Conflict(key.to_string()));
        }

        let mut updated = stored.clone();
        apply(&mut updated);
        updated.metadata.resource_version = Some(state.bump());
        match kind {
            StoreWrite::Finalizers => state.finalizer_writes += 1,
            StoreWrite::Status => state.status_writes += 1,
        }

        let released = updated.metadata.deletion_timestamp.is_some()
            && updated.metadata.finalizers.as_ref().is_none_or(Vec::is_empty);
        if released {
            state.objects.remove(&key);
        } else {
            state.objects.insert(key, updated.clone());
        }
        Ok(updated)
    }
}

#[async_trait::async_trait]
impl RepoStore for InMemoryRepoStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<Repo>, StoreError> {
        Ok(self.repo(key))
    }

    async fn set_finalizers(&self, repo: &Repo, finalizers: Vec<String>) -> Result<Repo, StoreError> {
        self.write(repo, StoreWrite::Finalizers, |stored| {
            stored.metadata.finalizers = Some(finalizers);
        })
    }

    async fn write_status(&self, repo: &Repo, status: &RepoStatus) -> Result<Repo, StoreError> {
        self.write(repo, StoreWrite::Status, |stored| {
            stored.status = Some(status.clone());
        })
    }
}

/// Reconciler wired to in-memory collaborators
pub struct TestHarness {
    pub reconciler: Reconciler,
    pub gitea: MockGiteaClient,
    pub store: InMemoryRepoStore,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(reconcile_timeout: Duration) -> Self {
        let gitea = MockGiteaClient::new("http://gitea.test");
        let store = InMemoryRepoStore::new();
        let reconciler = Reconciler::new(
            gitea.clone(),
            Arc::new(store.clone()),
            RequeuePolicy::default(),
            reconcile_timeout,
            3,
        );
        Self {
            reconciler,
            gitea,
            store,
        }
    }

    /// Insert a Repo and return its key
    pub fn add(&self, repo: Repo) -> ObjectKey {
        let repo = self.store.insert(repo);
        ObjectKey::for_repo(&repo).unwrap()
    }
}
