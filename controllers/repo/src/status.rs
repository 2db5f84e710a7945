//! Status publishing.
//!
//! Writes conditions onto a Repo's status subresource with a read-modify-write
//! against the object's resource version, reloading and retrying on conflicts.

use crate::store::{ObjectKey, RepoStore, StoreError};
use chrono::{DateTime, Utc};
use crds::{Condition, Repo, RepoStatus};
use std::sync::Arc;
use tracing::{debug, warn};

/// Status fields computed by one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    /// Conditions to set, replacing existing conditions of the same type
    pub conditions: Vec<Condition>,
    /// Generation the conditions were computed from
    pub observed_generation: Option<i64>,
    /// New mirror sync time, when a sync happened on this pass
    pub last_mirror_sync: Option<DateTime<Utc>>,
    /// Organization to record as the repository's owner
    pub owner: Option<String>,
}

/// Merge an update into the existing status.
///
/// A condition identical to the existing one of the same type (ignoring the
/// timestamp) keeps its original `last_transition_time`. Conditions of other
/// types are kept. There is never more than one condition per type.
pub fn merge_status(existing: Option<&RepoStatus>, update: &StatusUpdate) -> RepoStatus {
    let mut status = existing.cloned().unwrap_or_default();

    let mut merged: Vec<Condition> = Vec::with_capacity(status.conditions.len());
    for condition in status.conditions.drain(..) {
        if !merged.iter().any(|c| c.type_ == condition.type_) {
            merged.push(condition);
        }
    }
    for condition in &update.conditions {
        match merged.iter_mut().find(|c| c.type_ == condition.type_) {
            Some(current) if current.same_observation(condition) => {}
            Some(current) => *current = condition.clone(),
            None => merged.push(condition.clone()),
        }
    }
    status.conditions = merged;

    if update.observed_generation.is_some() {
        status.observed_generation = update.observed_generation;
    }
    if update.last_mirror_sync.is_some() {
        status.last_mirror_sync = update.last_mirror_sync;
    }
    if update.owner.is_some() {
        status.owner.clone_from(&update.owner);
    }
    status
}

/// Applies status updates with bounded conflict retries
#[derive(Clone)]
pub struct StatusPublisher {
    store: Arc<dyn RepoStore>,
    max_attempts: u32,
}

impl StatusPublisher {
    pub fn new(store: Arc<dyn RepoStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Apply `update` to the status of `repo`.
    ///
    /// Returns the object as last written (or as read, when the merge changed
    /// nothing), or `Ok(None)` if the object disappeared. A version conflict is
    /// retried against a freshly read object up to `max_attempts` writes, then
    /// surfaced as `StoreError::Conflict`.
    pub async fn apply(&self, repo: &Repo, update: &StatusUpdate) -> Result<Option<Repo>, StoreError> {
        let key = ObjectKey::for_repo(repo)?;
        let mut current = repo.clone();
        let mut attempt = 1;

        loop {
            let desired = merge_status(current.status.as_ref(), update);
            if current.status.as_ref() == Some(&desired) {
                debug!("Status of Repo {} unchanged, skipping write", key);
                return Ok(Some(current));
            }

            match self.store.write_status(&current, &desired).await {
                Ok(updated) => return Ok(Some(updated)),
                Err(StoreError::NotFound(_)) => {
                    debug!("Repo {} disappeared before its status was written", key);
                    return Ok(None);
                }
                Err(StoreError::Conflict(_)) if attempt < self.max_attempts => {
                    warn!(
                        "Status write for Repo {} conflicted (attempt {}/{}), reloading",
                        key, attempt, self.max_attempts
                    );
                    attempt += 1;
                    match self.store.get(&key).await? {
                        Some(fresh) => current = fresh,
                        None => return Ok(None),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
