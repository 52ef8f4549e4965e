//! EKS endpoint lookup for orchestrator access.

use anyhow::Result;
use aws_sdk_eks::Client;
use tracing::debug;

use crate::error::HypcapError;

/// Connection details of an EKS cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EksEndpoint {
    pub name: String,
    pub endpoint: String,
    /// Base64-encoded PEM bundle, as returned by `DescribeCluster`.
    pub ca_data: String,
}

#[derive(Clone)]
pub struct EksClient {
    client: Client,
}

impl EksClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Describe `cluster_name` and return its API endpoint and CA bundle.
    pub async fn endpoint(&self, cluster_name: &str) -> Result<EksEndpoint> {
        debug!("Describing EKS cluster: {}", cluster_name);

        let response = self
            .client
            .describe_cluster()
            .name(cluster_name)
            .send()
            .await
            .map_err(|e| HypcapError::aws(module_path!(), e))?;

        let cluster = response.cluster().ok_or_else(|| {
            HypcapError::OrchestratorNotFound(format!("EKS cluster {} not found", cluster_name))
        })?;

        let endpoint = cluster.endpoint().ok_or_else(|| {
            HypcapError::Kubeconfig(format!("EKS cluster {} has no endpoint", cluster_name))
        })?;

        let ca_data = cluster
            .certificate_authority()
            .and_then(|ca| ca.data())
            .ok_or_else(|| {
                HypcapError::Kubeconfig(format!("EKS cluster {} has no CA data", cluster_name))
            })?;

        Ok(EksEndpoint {
            name: cluster_name.to_string(),
            endpoint: endpoint.to_string(),
            ca_data: ca_data.to_string(),
        })
    }
}
