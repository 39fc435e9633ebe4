//! Kubernetes client bootstrap

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::info;

/// Conventional kubeconfig location under the invoking user's home
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".kube").join("istio-config"))
}

/// Build a client from an explicit kubeconfig, else from the conventional
/// file if present, else from the environment (in-cluster or `KUBECONFIG`).
pub async fn build(kubeconfig: Option<&Path>) -> Result<Client> {
    if let Some(path) = kubeconfig {
        return from_file(path).await;
    }

    match default_kubeconfig_path() {
        Some(path) if path.exists() => from_file(&path).await,
        _ => {
            info!("No kubeconfig file found, using default client configuration");
            Client::try_default()
                .await
                .context("failed to build default Kubernetes client")
        }
    }
}

async fn from_file(path: &Path) -> Result<Client> {
    info!(path = %path.display(), "Loading kubeconfig");
    let kubeconfig = Kubeconfig::read_from(path)
        .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .with_context(|| format!("invalid kubeconfig {}", path.display()))?;
    Client::try_from(config).context("failed to build Kubernetes client")
}
