//! SageMaker HyperPod control plane.

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_sagemaker::Client;
use aws_sdk_sagemaker::operation::describe_cluster::DescribeClusterOutput;
use aws_sdk_sagemaker::types::ClusterOrchestratorEksConfig;
use tracing::debug;

use crate::capacity::types::ClusterId;
use crate::capacity::upstream::{
    ClusterDescription, ControlPlane, InstanceGroupCount, OrchestratorRef,
};
use crate::error::HypcapError;

/// Largest page size accepted by `ListClusters`.
const MAX_PAGE_SIZE: usize = 100;

/// [`ControlPlane`] backed by the SageMaker `ListClusters` / `DescribeCluster` APIs.
#[derive(Clone)]
pub struct SageMakerControlPlane {
    client: Client,
}

impl SageMakerControlPlane {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ControlPlane for SageMakerControlPlane {
    async fn list_clusters(&self, limit: usize) -> Result<Vec<ClusterId>> {
        debug!("Listing HyperPod clusters (limit {})", limit);

        let mut clusters = Vec::new();
        let mut next_token: Option<String> = None;

        while clusters.len() < limit {
            let page_size = (limit - clusters.len()).min(MAX_PAGE_SIZE);
            let response = self
                .client
                .list_clusters()
                .max_results(page_size as i32)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| HypcapError::aws(module_path!(), e))?;

            for summary in response.cluster_summaries() {
                let name: Option<&str> = summary.cluster_name().into();
                if let Some(name) = name {
                    clusters.push(name.to_string());
                }
            }

            next_token = response.next_token().map(|s| s.to_string());
            if next_token.is_none() {
                break;
            }
        }

        clusters.truncate(limit);
        debug!("Found {} clusters", clusters.len());
        Ok(clusters)
    }

    async fn describe_cluster(&self, cluster: &str) -> Result<ClusterDescription> {
        debug!("Describing cluster: {}", cluster);

        let response = self
            .client
            .describe_cluster()
            .cluster_name(cluster)
            .send()
            .await
            .map_err(|e| HypcapError::aws(module_path!(), e))?;

        Ok(to_description(cluster, &response))
    }
}

fn to_description(cluster: &str, response: &DescribeClusterOutput) -> ClusterDescription {
    let instance_groups = response
        .instance_groups()
        .iter()
        .map(|group| InstanceGroupCount {
            name: group.instance_group_name().unwrap_or_default().to_string(),
            instance_type: group
                .instance_type()
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
            current_count: group.current_count().unwrap_or(0).max(0) as u32,
        })
        .collect();

    let orchestrator = response.orchestrator().and_then(|o| {
        let eks: Option<&ClusterOrchestratorEksConfig> = o.eks().into();
        let arn: Option<&str> = eks.and_then(|eks| eks.cluster_arn().into());
        arn.filter(|a| !a.is_empty()).map(|a| OrchestratorRef {
            eks_cluster_arn: a.to_string(),
        })
    });

    ClusterDescription {
        name: cluster.to_string(),
        instance_groups,
        orchestrator,
    }
}
