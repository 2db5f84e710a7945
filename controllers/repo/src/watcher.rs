//! Kubernetes resource watcher.
//!
//! Drives `Reconciler` from a `kube_runtime::Controller` over Repo objects.
//! The controller serializes reconciliations per object and bounds overall
//! concurrency.

use crate::error::{ControllerError, ErrorClass};
use crate::reconciler::Reconciler;
use crate::store::ObjectKey;
use crds::Repo;
use futures::StreamExt;
use kube::Api;
use kube_runtime::controller::{Action, Config as RuntimeConfig};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

async fn reconcile(repo: Arc<Repo>, reconciler: Arc<Reconciler>) -> Result<Action, ControllerError> {
    let key = ObjectKey::for_repo(&repo)?;
    debug!("Reconciling Repo {}", key);
    reconciler.reconcile(&key).await.map(Action::from)
}

fn error_policy(repo: Arc<Repo>, error: &ControllerError, reconciler: Arc<Reconciler>) -> Action {
    let requeue = reconciler.requeue_after_error(&repo, error);
    match error.class() {
        ErrorClass::Validation | ErrorClass::Conflict => {
            warn!("Reconciliation of Repo {:?} failed: {} (requeue: {:?})", repo.metadata.name, error, requeue);
        }
        ErrorClass::Transient | ErrorClass::Permanent => {
            error!("Reconciliation of Repo {:?} failed: {} (requeue: {:?})", repo.metadata.name, error, requeue);
        }
    }
    requeue.into()
}

/// Watch Repo objects and reconcile them until shutdown is signalled.
pub async fn run(api: Api<Repo>, reconciler: Arc<Reconciler>, concurrency: u16) {
    info!("Starting Repo watcher (concurrency {})", concurrency);

    // Debounce batches the burst of events caused by our own finalizer and status writes
    let runtime_config = RuntimeConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(concurrency);

    Controller::new(api, watcher::Config::default())
        .with_config(runtime_config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled Repo {}", obj),
                Err(e) => warn!("Repo controller error: {}", e),
            }
        })
        .await;

    info!("Repo watcher stopped");
}
