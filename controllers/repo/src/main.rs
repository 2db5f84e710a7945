//! Repo Controller
//!
//! Reconciles `Repo` CRDs (hyperspike.io/v1) against a Gitea instance:
//! creates, updates and deletes repositories, and keeps mirrors of upstream
//! remotes resynced on their declared interval.

mod backoff;
mod config;
mod duration;
mod error;
mod reconciler;
mod scheduler;
mod status;
mod store;
mod watcher;

#[cfg(test)]
mod test_utils;

use anyhow::Context;
use config::ControllerConfig;
use crds::Repo;
use gitea_client::GiteaClient;
use kube::{Api, Client};
use reconciler::Reconciler;
use std::sync::Arc;
use store::{KubeRepoStore, RepoStore};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Select ring before any TLS client is built
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Repo Controller");

    let config = ControllerConfig::from_env()?;
    info!("Configuration:");
    info!("  Gitea URL: {}", config.gitea_url);
    info!("  Namespace: {}", config.watch_namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Max concurrent reconciles: {}", config.max_concurrent_reconciles);

    let gitea = GiteaClient::new(config.gitea_url.clone(), config.gitea_token.clone())
        .context("Failed to create Gitea client")?;

    info!("Validating Gitea token and connectivity...");
    if let Err(e) = gitea.validate_token().await {
        error!("Failed to validate Gitea token: {}", e);
        error!("Please ensure GITEA_TOKEN is valid and Gitea is reachable at {}", config.gitea_url);
        return Err(e).context("Gitea token validation failed");
    }
    info!("Gitea token validated");

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let store: Arc<dyn RepoStore> = Arc::new(KubeRepoStore::new(client.clone()));

    let reconciler = Arc::new(Reconciler::new(
        gitea,
        store,
        config.requeue_policy(),
        config.reconcile_timeout(),
        config.status_max_attempts,
    ));

    let api: Api<Repo> = match &config.watch_namespace {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::all(client),
    };
    watcher::run(api, reconciler, config.max_concurrent_reconciles).await;

    Ok(())
}
