//! Kubernetes client module
//!
//! Handles connection to the Kubernetes API server. Proxy settings come from
//! the standard `HTTP_PROXY` / `HTTPS_PROXY` / `NO_PROXY` variables through
//! kube's `http-proxy` feature.

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

/// A connected client and the namespace its kubeconfig context selects
pub struct Connection {
    pub client: Client,
    pub default_namespace: String,
    /// Context name, `None` when running in-cluster
    pub context: Option<String>,
}

/// Initialize and return a Kubernetes client
///
/// With `context` set, that kubeconfig context is used. Otherwise the default
/// loading strategy applies:
/// 1. In-cluster config (if running in a pod)
/// 2. KUBECONFIG environment variable
/// 3. ~/.kube/config
pub async fn connect(context: Option<&str>) -> Result<Connection> {
    let config = match context {
        Some(name) => {
            let options = KubeConfigOptions {
                context: Some(name.to_string()),
                ..Default::default()
            };
            Config::from_kubeconfig(&options)
                .await
                .with_context(|| format!("Failed to load kubeconfig context '{}'", name))?
        }
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };

    let default_namespace = config.default_namespace.clone();
    let context = context.map(str::to_string).or_else(current_context);
    tracing::debug!(
        "Connecting to {} (context {:?}, namespace {})",
        config.cluster_url,
        context,
        default_namespace
    );

    let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
    Ok(Connection {
        client,
        default_namespace,
        context,
    })
}

/// Current context from the local kubeconfig, if there is one
fn current_context() -> Option<String> {
    Kubeconfig::read().ok()?.current_context
}
