//! Per-cluster capacity fetch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::capacity::aggregate::summarize_nodes;
use crate::capacity::quota::{QuotaTable, quota_group_for};
use crate::capacity::rate_limit::RateLimiter;
use crate::capacity::types::{CapacityRow, InstanceTypeSummary, NamespaceQuota};
use crate::capacity::upstream::{AccessHandle, ClusterAccess, ControlPlane, Orchestrator};
use crate::error::HypcapError;

/// Label selecting nodes that belong to the HyperPod fleet.
pub const FLEET_NODE_SELECTOR: &str = "sagemaker.amazonaws.com/compute-type=hyperpod";

/// Samples one cluster at a time; shared by reference across workers.
pub struct CapacityFetcher {
    control_plane: Arc<dyn ControlPlane>,
    access: Arc<dyn ClusterAccess>,
    limiter: Arc<RateLimiter>,
    namespaces: Vec<String>,
    access_dir: PathBuf,
    deadline: Duration,
}

impl CapacityFetcher {
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        access: Arc<dyn ClusterAccess>,
        limiter: Arc<RateLimiter>,
        namespaces: Vec<String>,
        access_dir: PathBuf,
        deadline: Duration,
    ) -> Self {
        Self {
            control_plane,
            access,
            limiter,
            namespaces,
            access_dir,
            deadline,
        }
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// Produce the capacity rows of `cluster`.
    ///
    /// Waits for a rate limiter slot first; the deadline only covers the
    /// upstream calls. `Ok(vec![])` means the cluster was skipped.
    pub async fn fetch(&self, cluster: &str) -> Result<Vec<CapacityRow>> {
        self.limiter.acquire().await;

        tokio::time::timeout(self.deadline, self.sample(cluster))
            .await
            .map_err(|_| HypcapError::Timeout {
                operation: format!("cluster {}", cluster),
                details: format!("exceeded {}s", self.deadline.as_secs()),
            })?
    }

    async fn sample(&self, cluster: &str) -> Result<Vec<CapacityRow>> {
        let description = self
            .control_plane
            .describe_cluster(cluster)
            .await
            .with_context(|| format!("Failed to describe cluster {}", cluster))?;
        for group in &description.instance_groups {
            debug!(
                "Cluster {}: instance group {} ({}) running {}",
                cluster, group.name, group.instance_type, group.current_count
            );
        }

        if description.current_instance_count() == 0 {
            debug!("Cluster {} has no running instances", cluster);
            return Ok(vec![CapacityRow {
                summary: InstanceTypeSummary::empty_cluster(cluster),
                quotas: self
                    .namespaces
                    .iter()
                    .map(|ns| NamespaceQuota::not_applicable(ns))
                    .collect(),
            }]);
        }

        let Some(orchestrator_ref) = description.orchestrator.as_ref() else {
            warn!(cluster = %cluster, "Skipping cluster: no EKS orchestrator reference");
            return Ok(Vec::new());
        };
        if let Err(e) = orchestrator_ref.eks_cluster_name() {
            warn!(cluster = %cluster, "Skipping cluster: {:#}", e);
            return Ok(Vec::new());
        }

        // Access material is private to this cluster
        let handle = AccessHandle::for_cluster(&self.access_dir, cluster);
        self.access
            .materialize(orchestrator_ref, &handle)
            .await
            .with_context(|| format!("Failed to materialize access for cluster {}", cluster))?;
        let orchestrator = self
            .access
            .connect(&handle)
            .await
            .with_context(|| format!("Failed to connect to cluster {}", cluster))?;

        let nodes = orchestrator
            .list_nodes(FLEET_NODE_SELECTOR)
            .await
            .with_context(|| format!("Failed to list nodes of cluster {}", cluster))?;
        let allocated = orchestrator
            .allocated_accelerators_by_node()
            .await
            .with_context(|| {
                format!("Failed to list allocated accelerators of cluster {}", cluster)
            })?;
        debug!(
            "Cluster {}: {} fleet nodes, {} nodes with allocated accelerators",
            cluster,
            nodes.len(),
            allocated.len()
        );

        let summaries = summarize_nodes(cluster, &nodes, &allocated)?;

        // One quota table per requested namespace, in request order
        let mut tables = Vec::with_capacity(self.namespaces.len());
        for namespace in &self.namespaces {
            tables.push(resolve_quota_table(orchestrator.as_ref(), namespace).await?);
        }

        Ok(summaries
            .into_iter()
            .map(|summary| {
                let quotas = self
                    .namespaces
                    .iter()
                    .zip(&tables)
                    .map(|(namespace, table)| table.resolve(namespace, &summary.instance_type))
                    .collect();
                CapacityRow { summary, quotas }
            })
            .collect())
    }
}

/// Fetch and parse the quota table of one namespace.
///
/// Namespaces that do not exist or are not quota-managed yield an empty
/// table, so every column resolves to "N/A".
async fn resolve_quota_table(
    orchestrator: &dyn Orchestrator,
    namespace: &str,
) -> Result<QuotaTable> {
    let Some(labels) = orchestrator
        .namespace_labels(namespace)
        .await
        .with_context(|| format!("Failed to get namespace {}", namespace))?
    else {
        debug!("Namespace {} not found", namespace);
        return Ok(QuotaTable::default());
    };

    let Some(group) = quota_group_for(&labels) else {
        debug!("Namespace {} is not quota-managed", namespace);
        return Ok(QuotaTable::default());
    };

    match orchestrator
        .quota_object(&group)
        .await
        .with_context(|| format!("Failed to get quota object {}", group))?
    {
        Some(object) => {
            let table = QuotaTable::from_cluster_queue(&object);
            if table.is_empty() {
                debug!("Quota object {} has no accelerator quota", group);
            }
            Ok(table)
        }
        None => {
            warn!("Quota object {} for namespace {} not found", group, namespace);
            Ok(QuotaTable::default())
        }
    }
}
