//! Requeue scheduling.
//!
//! Maps the outcome of a reconciliation pass to a scheduling directive. Pure:
//! the caller supplies the consecutive failure count and the time remaining
//! until the next mirror boundary.

use crate::backoff::ExponentialBackoff;
use crate::error::ErrorClass;
use kube_runtime::controller::Action;
use std::time::Duration;

/// Scheduling decision returned by a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
    /// Wait for the next change event
    None,
    /// Reconcile again after the delay (zero means immediately)
    After(Duration),
}

impl From<Requeue> for Action {
    fn from(requeue: Requeue) -> Self {
        match requeue {
            Requeue::None => Action::await_change(),
            Requeue::After(delay) => Action::requeue(delay),
        }
    }
}

/// How a reconciliation pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The pass completed; `mirror_delay` is set for mirrors
    Converged { mirror_delay: Option<Duration> },
    /// The pass failed after `failures` consecutive failures (including this one)
    Failed {
        class: ErrorClass,
        failures: u32,
        mirror_delay: Option<Duration>,
    },
}

/// Policy constants for requeue decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequeuePolicy {
    /// Delay after the first failure
    pub backoff_base: Duration,
    /// Ceiling for transient failure backoff
    pub backoff_max: Duration,
    /// Ceiling for backoff after a permanent rejection
    pub permanent_backoff_max: Duration,
    /// Floor for mirror-interval requeues
    pub min_mirror_requeue: Duration,
}

impl Default for RequeuePolicy {
    fn default() -> Self {
        Self {
            backoff_base: Duration::from_secs(5),
            backoff_max: Duration::from_secs(300),
            permanent_backoff_max: Duration::from_secs(3600),
            min_mirror_requeue: Duration::from_secs(10),
        }
    }
}

impl RequeuePolicy {
    /// Decide when to reconcile again.
    pub fn decide(&self, outcome: Outcome) -> Requeue {
        match outcome {
            Outcome::Converged { mirror_delay } => match mirror_delay {
                Some(delay) => Requeue::After(self.clamp_mirror(delay)),
                None => Requeue::None,
            },
            Outcome::Failed { class, failures, mirror_delay } => {
                let backoff = match class {
                    ErrorClass::Validation => return Requeue::None,
                    ErrorClass::Conflict => return Requeue::After(Duration::ZERO),
                    ErrorClass::Transient => {
                        ExponentialBackoff::new(self.backoff_base, self.backoff_max).delay_for(failures)
                    }
                    ErrorClass::Permanent => {
                        ExponentialBackoff::new(self.backoff_base, self.permanent_backoff_max)
                            .delay_for(failures)
                    }
                };
                let delay = match mirror_delay {
                    Some(mirror) => backoff.min(self.clamp_mirror(mirror)),
                    None => backoff,
                };
                Requeue::After(delay)
            }
        }
    }

    fn clamp_mirror(&self, delay: Duration) -> Duration {
        delay.max(self.min_mirror_requeue)
    }
}
