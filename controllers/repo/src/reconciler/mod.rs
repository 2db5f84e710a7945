//! Reconciliation engine for Repo resources.
//!
//! One entry point, `Reconciler::reconcile`, loads the Repo by key and runs
//! either the convergence path (`converge`) or the deletion path (`finalize`).
//! Every outbound call is bounded by the pass deadline. Failures are recorded
//! as a `Ready=False` condition before the error is returned.

mod converge;
mod desired;
mod finalize;


use crate::error::{ControllerError, ErrorClass};
use crate::scheduler::{Outcome, Requeue, RequeuePolicy};
use crate::status::{StatusPublisher, StatusUpdate};
use crate::store::{ObjectKey, RepoStore};
use chrono::Utc;
use crds::{reasons, Condition, Repo, CONDITION_READY, CONDITION_SYNCED};
use gitea_client::GiteaClientTrait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Await `call`, failing with `DeadlineExceeded` once `deadline` passes.
///
/// The call future is dropped on expiry, which aborts the request.
pub(crate) async fn within<T, E, F>(deadline: Instant, call: F) -> Result<T, ControllerError>
where
    F: Future<Output = Result<T, E>>,
    ControllerError: From<E>,
{
    match tokio::time::timeout_at(deadline, call).await {
        Ok(result) => result.map_err(ControllerError::from),
        Err(_) => Err(ControllerError::DeadlineExceeded),
    }
}

/// Reconciles Repo resources against Gitea.
pub struct Reconciler {
    pub(crate) gitea: Box<dyn GiteaClientTrait + Send + Sync>,
    pub(crate) store: Arc<dyn RepoStore>,
    pub(crate) publisher: StatusPublisher,
    pub(crate) policy: RequeuePolicy,
    reconcile_timeout: Duration,
    /// Consecutive failure count per resource (namespace/name -> count)
    failure_counts: Arc<Mutex<HashMap<String, u32>>>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        gitea: impl GiteaClientTrait + Send + Sync + 'static,
        store: Arc<dyn RepoStore>,
        policy: RequeuePolicy,
        reconcile_timeout: Duration,
        status_max_attempts: u32,
    ) -> Self {
        Self {
            gitea: Box::new(gitea),
            publisher: StatusPublisher::new(Arc::clone(&store), status_max_attempts),
            store,
            policy,
            reconcile_timeout,
            failure_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run one reconciliation pass for the Repo identified by `key`.
    ///
    /// A key whose object no longer exists is a successful no-op.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<Requeue, ControllerError> {
        let deadline = Instant::now() + self.reconcile_timeout;

        let Some(repo) = within(deadline, self.store.get(key)).await? else {
            debug!("Repo {} not found, nothing to reconcile", key);
            self.reset_failures(key);
            return Ok(Requeue::None);
        };

        let result = if repo.is_being_deleted() {
            self.finalize(&repo, key, deadline).await
        } else {
            self.converge(&repo, key, deadline).await
        };

        match result {
            Ok(requeue) => {
                self.reset_failures(key);
                Ok(requeue)
            }
            Err(e) => {
                self.publish_failure(&repo, key, &e).await;
                Err(e)
            }
        }
    }

    /// Requeue directive for a failed pass; counts the failure.
    pub fn requeue_after_error(&self, repo: &Repo, error: &ControllerError) -> Requeue {
        let class = error.class();
        let failures = match ObjectKey::for_repo(repo) {
            Ok(key) if matches!(class, ErrorClass::Transient | ErrorClass::Permanent) => {
                self.record_failure(&key)
            }
            Ok(key) => self.failure_count(&key),
            Err(_) => 1,
        };
        let mirror_delay = desired::mirror_delay_from_status(repo, Utc::now());

        self.policy.decide(Outcome::Failed {
            class,
            failures,
            mirror_delay,
        })
    }

    async fn publish_failure(&self, repo: &Repo, key: &ObjectKey, error: &ControllerError) {
        let reason = match error.class() {
            ErrorClass::Validation => reasons::INVALID_SPEC,
            ErrorClass::Permanent => reasons::REJECTED_BY_SERVICE,
            ErrorClass::Transient => reasons::TEMPORARY_ERROR,
            ErrorClass::Conflict => reasons::CONFLICT,
        };
        let now = Utc::now();
        // Mirror state is unknown after a failed pass
        let update = StatusUpdate {
            conditions: vec![
                Condition::new(CONDITION_READY, false, reason, error.to_string(), now),
                Condition::new(CONDITION_SYNCED, false, reason, "reconciliation did not complete", now),
            ],
            observed_generation: repo.metadata.generation,
            last_mirror_sync: None,
            owner: None,
        };

        // The pass deadline may already be spent
        let deadline = Instant::now() + self.reconcile_timeout;
        if let Err(e) = within(deadline, self.publisher.apply(repo, &update)).await {
            warn!("Failed to record {} on Repo {}: {}", reason, key, e);
        }
    }

    async fn publish(
        &self,
        repo: &Repo,
        update: &StatusUpdate,
        deadline: Instant,
    ) -> Result<Option<Repo>, ControllerError> {
        within(deadline, self.publisher.apply(repo, update)).await
    }

    fn failure_counts(&self) -> MutexGuard<'_, HashMap<String, u32>> {
        match self.failure_counts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn record_failure(&self, key: &ObjectKey) -> u32 {
        let mut counts = self.failure_counts();
        let count = counts.entry(key.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    pub(crate) fn failure_count(&self, key: &ObjectKey) -> u32 {
        self.failure_counts().get(&key.to_string()).copied().unwrap_or(0)
    }

    fn reset_failures(&self, key: &ObjectKey) {
        self.failure_counts().remove(&key.to_string());
    }
}
