//! Convergence path: create, update and resync the Gitea repository.

use super::desired::{last_known_sync, mirror_sync_due, time_until_next_sync, DesiredRepo};
use super::{within, Reconciler};
use crate::error::ControllerError;
use crate::scheduler::{Outcome, Requeue};
use crate::status::StatusUpdate;
use crate::store::{ObjectKey, StoreError};
use chrono::Utc;
use crds::{reasons, Condition, Repo, CONDITION_READY, CONDITION_SYNCED, REPO_FINALIZER};
use gitea_client::{CreateOutcome, Repository};
use kube::ResourceExt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

impl Reconciler {
    pub(super) async fn converge(
        &self,
        repo: &Repo,
        key: &ObjectKey,
        deadline: Instant,
    ) -> Result<Requeue, ControllerError> {
        let desired = DesiredRepo::from_repo(repo)?;

        if !repo.has_finalizer() {
            return self.add_finalizer(repo, &desired, key, deadline).await;
        }

        let Some(current) = self.claim_owner(repo, &desired, key, deadline).await? else {
            return Ok(Requeue::None);
        };
        let repo = &current;

        let now = Utc::now();
        let remote = within(deadline, self.gitea.get_repo(&desired.owner, &desired.name)).await?;

        let mut last_mirror_sync = None;
        let mut mirror_delay = None;
        let synced = match remote {
            None => {
                match within(deadline, self.gitea.create_repo(&desired.owner, &desired.new_repo())).await? {
                    CreateOutcome::Created(created) => {
                        info!("Created repository {} in Gitea for Repo {}", created.full_name, key);
                    }
                    CreateOutcome::AlreadyExists => {
                        info!("Repository {} already existed in Gitea for Repo {}", desired.full_name(), key);
                    }
                }
                match &desired.mirror {
                    // Migration clones the upstream
                    Some(mirror) => {
                        last_mirror_sync = Some(now);
                        mirror_delay = Some(mirror.interval);
                        Condition::new(
                            CONDITION_SYNCED,
                            true,
                            reasons::MIRROR_SYNC_TRIGGERED,
                            format!("initial mirror of {}", mirror.clone_addr),
                            now,
                        )
                    }
                    None => not_mirror(now),
                }
            }
            Some(existing) => {
                self.update_existing(&desired, &existing, key, deadline).await?;

                match &desired.mirror {
                    None => not_mirror(now),
                    Some(mirror) => {
                        let recorded = repo.status.as_ref().and_then(|s| s.last_mirror_sync);
                        let last = last_known_sync(recorded, existing.mirror_updated);

                        match last {
                            Some(last) if !mirror_sync_due(Some(last), mirror.interval, now) => {
                                debug!("Mirror {} is up to date for Repo {}", desired.full_name(), key);
                                mirror_delay = Some(time_until_next_sync(last, mirror.interval, now));
                                Condition::new(
                                    CONDITION_SYNCED,
                                    false,
                                    reasons::MIRROR_UP_TO_DATE,
                                    format!("mirror sync not yet due (interval {})", mirror.interval_spec),
                                    now,
                                )
                            }
                            _ => {
                                within(deadline, self.gitea.trigger_mirror_sync(&desired.owner, &desired.name))
                                    .await?;
                                info!("Triggered mirror sync of {} for Repo {}", desired.full_name(), key);
                                last_mirror_sync = Some(now);
                                mirror_delay = Some(mirror.interval);
                                Condition::new(
                                    CONDITION_SYNCED,
                                    true,
                                    reasons::MIRROR_SYNC_TRIGGERED,
                                    format!("mirror sync triggered from {}", mirror.clone_addr),
                                    now,
                                )
                            }
                        }
                    }
                }
            }
        };

        let update = StatusUpdate {
            conditions: vec![
                Condition::new(
                    CONDITION_READY,
                    true,
                    reasons::RECONCILED,
                    format!("repository {} matches the declared state", desired.full_name()),
                    now,
                ),
                synced,
            ],
            observed_generation: repo.metadata.generation,
            last_mirror_sync,
            owner: Some(desired.owner.clone()),
        };
        self.publish(repo, &update, deadline).await?;

        Ok(self.policy.decide(Outcome::Converged { mirror_delay }))
    }

    async fn update_existing(
        &self,
        desired: &DesiredRepo,
        existing: &Repository,
        key: &ObjectKey,
        deadline: Instant,
    ) -> Result<(), ControllerError> {
        if existing.mirror != desired.mirror.is_some() {
            return Err(ControllerError::Rejected(format!(
                "repository {} exists with mirror={} but the Repo declares mirror={}; \
                 the mirror flag of an existing repository cannot be changed",
                desired.full_name(),
                existing.mirror,
                desired.mirror.is_some()
            )));
        }
        if let Some(mirror) = &desired.mirror {
            if !existing.original_url.is_empty() && existing.original_url != mirror.clone_addr {
                warn!(
                    "Repository {} mirrors {} but Repo {} declares {}; the clone address cannot be changed in place",
                    desired.full_name(),
                    existing.original_url,
                    key,
                    mirror.clone_addr
                );
            }
        }

        let edit = desired.plan_update(existing);
        if edit.is_empty() {
            debug!("Repository {} already matches Repo {}", desired.full_name(), key);
            return Ok(());
        }

        within(deadline, self.gitea.update_repo(&desired.owner, &desired.name, &edit)).await?;
        info!(
            "Updated repository {} for Repo {} (description: {}, mirror interval: {})",
            desired.full_name(),
            key,
            edit.description.is_some(),
            edit.mirror_interval.is_some()
        );
        Ok(())
    }

    /// Make sure status names `desired.owner` before anything is created there.
    ///
    /// A repository already present under a different recorded organization
    /// cannot be moved, so the pass is rejected and the old repository stays
    /// the one deletion will remove. Returns the object as last written, or
    /// `None` if it disappeared.
    async fn claim_owner(
        &self,
        repo: &Repo,
        desired: &DesiredRepo,
        key: &ObjectKey,
        deadline: Instant,
    ) -> Result<Option<Repo>, ControllerError> {
        match repo.recorded_owner() {
            Some(owner) if owner == desired.owner => return Ok(Some(repo.clone())),
            Some(owner) => {
                if within(deadline, self.gitea.get_repo(owner, &desired.name)).await?.is_some() {
                    return Err(ControllerError::Rejected(format!(
                        "repository {}/{} already exists; it cannot be moved to organization {}",
                        owner, desired.name, desired.owner
                    )));
                }
                info!(
                    "Repo {} moves from organization {} to {}; nothing exists under {}",
                    key, owner, desired.owner, owner
                );
            }
            None => debug!("Recording organization {} for Repo {}", desired.owner, key),
        }

        let update = StatusUpdate {
            owner: Some(desired.owner.clone()),
            ..Default::default()
        };
        self.publish(repo, &update, deadline).await
    }

    /// Persist the finalizer before anything is created in Gitea.
    ///
    /// The resulting update event triggers the next pass.
    async fn add_finalizer(
        &self,
        repo: &Repo,
        desired: &DesiredRepo,
        key: &ObjectKey,
        deadline: Instant,
    ) -> Result<Requeue, ControllerError> {
        let mut finalizers = repo.finalizers().to_vec();
        finalizers.push(REPO_FINALIZER.to_string());

        let updated = match within(deadline, self.store.set_finalizers(repo, finalizers)).await {
            Ok(updated) => updated,
            Err(ControllerError::Store(StoreError::NotFound(_))) => return Ok(Requeue::None),
            Err(e) => return Err(e),
        };
        info!("Added finalizer to Repo {}", key);

        // A recorded owner that differs is settled by the next pass
        let owner = match repo.recorded_owner() {
            Some(_) => None,
            None => Some(desired.owner.clone()),
        };
        let update = StatusUpdate {
            conditions: vec![Condition::new(
                CONDITION_READY,
                false,
                reasons::RECONCILING,
                "finalizer added",
                Utc::now(),
            )],
            observed_generation: repo.metadata.generation,
            last_mirror_sync: None,
            owner,
        };
        self.publish(&updated, &update, deadline).await?;
        Ok(Requeue::None)
    }
}

fn not_mirror(now: chrono::DateTime<Utc>) -> Condition {
    Condition::new(CONDITION_SYNCED, true, reasons::NOT_MIRROR, "repository is not a mirror", now)
}
