//! Per-cluster kubeconfig materialization and client construction.
//!
//! Each cluster gets its own kubeconfig file whose user runs
//! `aws eks get-token`, so tokens are refreshed by kube's exec plugin and
//! no credentials are written to disk.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::aws::eks::{EksClient, EksEndpoint};
use crate::capacity::upstream::{AccessHandle, ClusterAccess, Orchestrator, OrchestratorRef};
use crate::error::HypcapError;
use crate::k8s::client::KubeOrchestrator;

/// [`ClusterAccess`] that writes exec-based kubeconfigs for EKS orchestrators.
pub struct KubeAccess {
    eks: EksClient,
    region: String,
    profile: Option<String>,
}

impl KubeAccess {
    pub fn new(eks: EksClient, region: String, profile: Option<String>) -> Self {
        Self {
            eks,
            region,
            profile,
        }
    }
}

#[async_trait]
impl ClusterAccess for KubeAccess {
    async fn materialize(
        &self,
        orchestrator: &OrchestratorRef,
        handle: &AccessHandle,
    ) -> Result<()> {
        let eks_name = orchestrator.eks_cluster_name()?;
        let endpoint = self.eks.endpoint(eks_name).await?;

        let kubeconfig = render_kubeconfig(
            &orchestrator.eks_cluster_arn,
            &endpoint,
            &self.region,
            self.profile.as_deref(),
        );

        let path = handle.kubeconfig();
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        tokio::fs::write(path, serde_json::to_vec_pretty(&kubeconfig)?)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!(
            "Wrote kubeconfig for cluster {} to {}",
            handle.cluster(),
            path.display()
        );
        Ok(())
    }

    async fn connect(&self, handle: &AccessHandle) -> Result<Box<dyn Orchestrator>> {
        let path = handle.kubeconfig();
        let kubeconfig = kube::config::Kubeconfig::read_from(path)
            .map_err(|e| HypcapError::Kubeconfig(format!("{}: {}", path.display(), e)))?;

        let config = kube::Config::from_custom_kubeconfig(
            kubeconfig,
            &kube::config::KubeConfigOptions::default(),
        )
        .await
        .map_err(|e| HypcapError::Kubeconfig(format!("cluster '{}': {}", handle.cluster(), e)))?;

        let client = kube::Client::try_from(config).map_err(|e| {
            HypcapError::Kubeconfig(format!("cluster '{}': {}", handle.cluster(), e))
        })?;

        Ok(Box::new(KubeOrchestrator::new(client)))
    }
}

/// Build a single-context kubeconfig for an EKS cluster.
///
/// The context is named after the cluster ARN, like `aws eks update-kubeconfig`.
pub fn render_kubeconfig(
    context: &str,
    endpoint: &EksEndpoint,
    region: &str,
    profile: Option<&str>,
) -> Value {
    let env: Vec<Value> = profile
        .map(|p| json!({ "name": "AWS_PROFILE", "value": p }))
        .into_iter()
        .collect();

    json!({
        "apiVersion": "v1",
        "kind": "Config",
        "current-context": context,
        "clusters": [{
            "name": context,
            "cluster": {
                "server": endpoint.endpoint,
                "certificate-authority-data": endpoint.ca_data,
            },
        }],
        "contexts": [{
            "name": context,
            "context": {
                "cluster": context,
                "user": context,
            },
        }],
        "users": [{
            "name": context,
            "user": {
                "exec": {
                    "apiVersion": "client.authentication.k8s.io/v1beta1",
                    "command": "aws",
                    "args": [
                        "eks", "get-token",
                        "--cluster-name", endpoint.name,
                        "--region", region,
                        "--output", "json",
                    ],
                    "env": env,
                    "provideClusterInfo": false,
                    "interactiveMode": "Never",
                },
            },
        }],
    })
}
