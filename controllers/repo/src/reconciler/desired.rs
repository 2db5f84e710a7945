//! Validated desired state of a Repo and the update plan against Gitea.

use crate::duration::{parse_go_duration, parse_positive_duration};
use crate::error::ControllerError;
use chrono::{DateTime, Utc};
use crds::Repo;
use gitea_client::{EditRepoOption, NewRepo, Repository};
use std::time::Duration;

const CLONE_SCHEMES: [&str; 4] = ["http", "https", "git", "ssh"];

/// Mirror settings of a validated spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MirrorSettings {
    pub clone_addr: String,
    pub interval: Duration,
    /// Interval as declared, sent to Gitea unchanged
    pub interval_spec: String,
}

/// A Repo spec that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DesiredRepo {
    pub owner: String,
    pub name: String,
    pub description: String,
    pub mirror: Option<MirrorSettings>,
}

impl DesiredRepo {
    /// Validate the spec of `repo`.
    ///
    /// Fails with `ControllerError::InvalidSpec` without contacting Gitea.
    pub fn from_repo(repo: &Repo) -> Result<Self, ControllerError> {
        let invalid = |msg: String| ControllerError::InvalidSpec(msg);

        let name = repo
            .metadata
            .name
            .clone()
            .ok_or_else(|| invalid("metadata.name is required".to_string()))?;
        let owner = repo
            .spec
            .org
            .as_ref()
            .map(|org| org.name.trim().to_string())
            .filter(|org| !org.is_empty())
            .ok_or_else(|| invalid("spec.org.name is required".to_string()))?;

        let mirror = if repo.spec.mirror {
            let clone_addr = repo
                .spec
                .clone_addr
                .as_deref()
                .map(str::trim)
                .filter(|addr| !addr.is_empty())
                .ok_or_else(|| invalid("spec.cloneAddr is required when spec.mirror is true".to_string()))?;
            validate_clone_addr(clone_addr).map_err(invalid)?;

            let interval_spec = repo
                .spec
                .mirror_interval
                .as_deref()
                .map(str::trim)
                .filter(|interval| !interval.is_empty())
                .ok_or_else(|| invalid("spec.mirrorInterval is required when spec.mirror is true".to_string()))?;
            let interval = parse_positive_duration(interval_spec)
                .map_err(|e| invalid(format!("spec.mirrorInterval: {e}")))?;

            Some(MirrorSettings {
                clone_addr: clone_addr.to_string(),
                interval,
                interval_spec: interval_spec.to_string(),
            })
        } else {
            None
        };

        Ok(Self {
            owner,
            name,
            description: repo.spec.description.clone(),
            mirror,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Create request for a missing repository
    pub fn new_repo(&self) -> NewRepo {
        NewRepo {
            name: self.name.clone(),
            description: self.description.clone(),
            mirror: self.mirror.is_some(),
            clone_addr: self.mirror.as_ref().map(|m| m.clone_addr.clone()),
            mirror_interval: self.mirror.as_ref().map(|m| m.interval_spec.clone()),
        }
    }

    /// Fields of `existing` that differ from the declaration.
    ///
    /// Intervals are compared as durations, so "8h" matches Gitea's "8h0m0s".
    pub fn plan_update(&self, existing: &Repository) -> EditRepoOption {
        let description = (existing.description != self.description).then(|| self.description.clone());

        let mirror_interval = match &self.mirror {
            Some(mirror) if existing.mirror => {
                let current = parse_go_duration(&existing.mirror_interval).ok();
                (current != Some(mirror.interval)).then(|| mirror.interval_spec.clone())
            }
            _ => None,
        };

        EditRepoOption {
            description,
            mirror_interval,
        }
    }
}

fn validate_clone_addr(addr: &str) -> Result<(), String> {
    let url = reqwest::Url::parse(addr)
        .map_err(|e| format!("spec.cloneAddr {addr:?} is not an absolute URL: {e}"))?;
    if !CLONE_SCHEMES.contains(&url.scheme()) {
        return Err(format!(
            "spec.cloneAddr scheme {:?} is not supported (expected one of {})",
            url.scheme(),
            CLONE_SCHEMES.join(", ")
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(format!("spec.cloneAddr {addr:?} has no host"));
    }
    Ok(())
}

/// The later of the controller's own sync record and Gitea's.
pub(crate) fn last_known_sync(
    recorded: Option<DateTime<Utc>>,
    remote: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    recorded.max(remote)
}

fn next_sync_at(last: DateTime<Utc>, interval: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(interval)
        .ok()
        .and_then(|interval| last.checked_add_signed(interval))
}

/// Whether a full interval has elapsed since the last sync.
pub(crate) fn mirror_sync_due(last: Option<DateTime<Utc>>, interval: Duration, now: DateTime<Utc>) -> bool {
    match last {
        None => true,
        Some(last) => next_sync_at(last, interval).is_some_and(|next| next <= now),
    }
}

/// Time remaining until the next mirror boundary; zero when already due.
pub(crate) fn time_until_next_sync(last: DateTime<Utc>, interval: Duration, now: DateTime<Utc>) -> Duration {
    match next_sync_at(last, interval) {
        Some(next) => (next - now).to_std().unwrap_or(Duration::ZERO),
        None => interval,
    }
}

/// Mirror boundary delay derived from the Repo object alone.
///
/// `None` for non-mirrors and for mirrors that have never synced.
pub(crate) fn mirror_delay_from_status(repo: &Repo, now: DateTime<Utc>) -> Option<Duration> {
    if !repo.spec.mirror {
        return None;
    }
    let interval = parse_positive_duration(repo.spec.mirror_interval.as_deref()?).ok()?;
    let last = repo.status.as_ref()?.last_mirror_sync?;
    Some(time_until_next_sync(last, interval, now))
}
