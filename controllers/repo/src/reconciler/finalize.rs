//! Deletion path: remove the Gitea repository, then release the finalizer.
//!
//! The finalizer is removed only after Gitea confirms the repository is gone.
//! Any failure before that leaves the finalizer in place, so the cluster keeps
//! the object until a later pass succeeds.

use super::{within, Reconciler};
use crate::error::ControllerError;
use crate::scheduler::Requeue;
use crate::status::StatusUpdate;
use crate::store::{ObjectKey, StoreError};
use chrono::Utc;
use crds::{reasons, Condition, Repo, CONDITION_READY, REPO_FINALIZER};
use gitea_client::DeleteOutcome;
use kube::ResourceExt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

impl Reconciler {
    pub(super) async fn finalize(
        &self,
        repo: &Repo,
        key: &ObjectKey,
        deadline: Instant,
    ) -> Result<Requeue, ControllerError> {
        if !repo.has_finalizer() {
            debug!("Repo {} is being deleted without our finalizer, nothing to do", key);
            return Ok(Requeue::None);
        }

        // The recorded owner wins over the spec, which may have been edited since
        let declared = repo
            .spec
            .org
            .as_ref()
            .map(|org| org.name.trim().to_string())
            .filter(|org| !org.is_empty());
        let Some(owner) = repo.recorded_owner().map(str::to_string).or(declared) else {
            warn!("Repo {} never recorded an organization, no Gitea repository to delete", key);
            return self.release_finalizer(repo, key, deadline).await;
        };
        let name = key.name.as_str();

        let mut current = repo.clone();
        if within(deadline, self.gitea.get_repo(&owner, name)).await?.is_some() {
            let update = StatusUpdate {
                conditions: vec![Condition::new(
                    CONDITION_READY,
                    false,
                    reasons::DELETING,
                    format!("deleting repository {}/{}", owner, name),
                    Utc::now(),
                )],
                observed_generation: repo.metadata.generation,
                last_mirror_sync: None,
                owner: None,
            };
            match self.publish(repo, &update, deadline).await? {
                Some(updated) => current = updated,
                None => return Ok(Requeue::None),
            }

            match within(deadline, self.gitea.delete_repo(&owner, name)).await? {
                DeleteOutcome::Deleted => info!("Deleted repository {}/{} for Repo {}", owner, name, key),
                DeleteOutcome::NotFound => debug!("Repository {}/{} was already gone", owner, name),
            }
        } else {
            debug!("Repository {}/{} does not exist in Gitea", owner, name);
        }

        self.release_finalizer(&current, key, deadline).await
    }

    async fn release_finalizer(
        &self,
        repo: &Repo,
        key: &ObjectKey,
        deadline: Instant,
    ) -> Result<Requeue, ControllerError> {
        let finalizers: Vec<String> = repo
            .finalizers()
            .iter()
            .filter(|f| f.as_str() != REPO_FINALIZER)
            .cloned()
            .collect();

        match within(deadline, self.store.set_finalizers(repo, finalizers)).await {
            Ok(_) => {
                info!("Removed finalizer from Repo {}", key);
                Ok(Requeue::None)
            }
            Err(ControllerError::Store(StoreError::NotFound(_))) => Ok(Requeue::None),
            Err(e) => Err(e),
        }
    }
}
