//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::error::ControllerError;
use crate::scheduler::RequeuePolicy;
use std::str::FromStr;
use std::time::Duration;

/// Default Gitea endpoint inside the cluster
pub const DEFAULT_GITEA_URL: &str = "http://gitea-http.gitea:3000";
/// Default first retry delay after a failure (seconds)
pub const DEFAULT_BACKOFF_BASE_SECS: u64 = 5;
/// Default ceiling for transient failure backoff (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;
/// Default ceiling for backoff after Gitea rejected a request (seconds)
pub const DEFAULT_PERMANENT_BACKOFF_MAX_SECS: u64 = 3600;
/// Default floor for mirror-interval requeues (seconds)
pub const DEFAULT_MIN_MIRROR_REQUEUE_SECS: u64 = 10;
/// Default deadline for a single reconciliation pass (seconds)
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 60;
/// Default number of status write attempts on version conflicts
pub const DEFAULT_STATUS_MAX_ATTEMPTS: u32 = 3;
/// Default number of Repos reconciled in parallel
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 3;

/// Controller-level configuration
///
/// All settings except the Gitea token have defaults and can be overridden via
/// environment variables. Values that fail to parse are rejected at startup.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Gitea base URL
    pub gitea_url: String,
    /// Gitea API token
    pub gitea_token: String,
    /// Namespace to watch; all namespaces when `None`
    pub watch_namespace: Option<String>,
    /// First retry delay after a failure (seconds)
    pub backoff_base_secs: u64,
    /// Ceiling for transient failure backoff (seconds)
    pub backoff_max_secs: u64,
    /// Ceiling for backoff after a permanent rejection (seconds)
    pub permanent_backoff_max_secs: u64,
    /// Floor for mirror-interval requeues (seconds)
    pub min_mirror_requeue_secs: u64,
    /// Deadline for one reconciliation pass (seconds)
    pub reconcile_timeout_secs: u64,
    /// Status write attempts before a version conflict is surfaced
    pub status_max_attempts: u32,
    /// Maximum concurrent reconciliations
    pub max_concurrent_reconciles: u16,
}

impl ControllerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gitea_token = lookup("GITEA_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                ControllerError::InvalidConfig("GITEA_TOKEN environment variable is required".to_string())
            })?;

        let config = Self {
            gitea_url: lookup("GITEA_URL").unwrap_or_else(|| DEFAULT_GITEA_URL.to_string()),
            gitea_token,
            watch_namespace: lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty()),
            backoff_base_secs: parse_or_default(&lookup, "BACKOFF_BASE_SECS", DEFAULT_BACKOFF_BASE_SECS)?,
            backoff_max_secs: parse_or_default(&lookup, "BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS)?,
            permanent_backoff_max_secs: parse_or_default(
                &lookup,
                "PERMANENT_BACKOFF_MAX_SECS",
                DEFAULT_PERMANENT_BACKOFF_MAX_SECS,
            )?,
            min_mirror_requeue_secs: parse_or_default(
                &lookup,
                "MIN_MIRROR_REQUEUE_SECS",
                DEFAULT_MIN_MIRROR_REQUEUE_SECS,
            )?,
            reconcile_timeout_secs: parse_or_default(
                &lookup,
                "RECONCILE_TIMEOUT_SECS",
                DEFAULT_RECONCILE_TIMEOUT_SECS,
            )?,
            status_max_attempts: parse_or_default(&lookup, "STATUS_MAX_ATTEMPTS", DEFAULT_STATUS_MAX_ATTEMPTS)?,
            max_concurrent_reconciles: parse_or_default(
                &lookup,
                "MAX_CONCURRENT_RECONCILES",
                DEFAULT_MAX_CONCURRENT_RECONCILES,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ControllerError> {
        if self.backoff_base_secs == 0 {
            return Err(ControllerError::InvalidConfig("BACKOFF_BASE_SECS must be greater than 0".to_string()));
        }
        if self.backoff_max_secs < self.backoff_base_secs {
            return Err(ControllerError::InvalidConfig(
                "BACKOFF_MAX_SECS must not be below BACKOFF_BASE_SECS".to_string(),
            ));
        }
        if self.permanent_backoff_max_secs < self.backoff_base_secs {
            return Err(ControllerError::InvalidConfig(
                "PERMANENT_BACKOFF_MAX_SECS must not be below BACKOFF_BASE_SECS".to_string(),
            ));
        }
        if self.min_mirror_requeue_secs == 0 {
            return Err(ControllerError::InvalidConfig(
                "MIN_MIRROR_REQUEUE_SECS must be greater than 0".to_string(),
            ));
        }
        if self.reconcile_timeout_secs == 0 {
            return Err(ControllerError::InvalidConfig("RECONCILE_TIMEOUT_SECS must be greater than 0".to_string()));
        }
        if self.status_max_attempts == 0 {
            return Err(ControllerError::InvalidConfig("STATUS_MAX_ATTEMPTS must be greater than 0".to_string()));
        }
        if self.max_concurrent_reconciles == 0 {
            return Err(ControllerError::InvalidConfig(
                "MAX_CONCURRENT_RECONCILES must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Requeue policy built from the backoff settings
    pub fn requeue_policy(&self) -> RequeuePolicy {
        RequeuePolicy {
            backoff_base: Duration::from_secs(self.backoff_base_secs),
            backoff_max: Duration::from_secs(self.backoff_max_secs),
            permanent_backoff_max: Duration::from_secs(self.permanent_backoff_max_secs),
            min_mirror_requeue: Duration::from_secs(self.min_mirror_requeue_secs),
        }
    }

    /// Deadline applied to each reconciliation pass
    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ControllerError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("{key}={raw:?} is not a valid number: {e}"))
        }),
    }
}
