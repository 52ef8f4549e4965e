//! In-memory upstream fakes for engine tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;

use crate::capacity::types::{ClusterId, HealthStatus, NodeRecord};
use crate::capacity::upstream::{
    AccessHandle, ClusterAccess, ClusterDescription, ControlPlane, InstanceGroupCount,
    Orchestrator, OrchestratorRef,
};

pub fn node(name: &str, instance_type: &str, health: &str, allocatable: Option<i64>) -> NodeRecord {
    NodeRecord {
        name: name.to_string(),
        instance_type: instance_type.to_string(),
        health: HealthStatus::from_label(Some(health)),
        deep_health_check: Some("Passed".to_string()),
        accelerator_allocatable: allocatable,
    }
}

pub fn eks_arn(cluster: &str) -> String {
    format!("arn:aws:eks:us-west-2:123456789012:cluster/{}-eks", cluster)
}

/// Description of a cluster running `count` instances of `instance_type`.
pub fn running(cluster: &str, instance_type: &str, count: u32) -> ClusterDescription {
    ClusterDescription {
        name: cluster.to_string(),
        instance_groups: vec![InstanceGroupCount {
            name: "workers".to_string(),
            instance_type: instance_type.to_string(),
            current_count: count,
        }],
        orchestrator: Some(OrchestratorRef {
            eks_cluster_arn: eks_arn(cluster),
        }),
    }
}

#[derive(Default)]
pub struct FakeControlPlane {
    pub listed: Vec<ClusterId>,
    pub fail_listing: bool,
    /// Clusters missing here fail `describe_cluster`.
    pub descriptions: HashMap<ClusterId, ClusterDescription>,
    pub describe_calls: Mutex<Vec<ClusterId>>,
    /// Simulated `describe_cluster` latency.
    pub describe_delay: Option<Duration>,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl FakeControlPlane {
    pub fn with(descriptions: Vec<ClusterDescription>) -> Self {
        Self {
            listed: descriptions.iter().map(|d| d.name.clone()).collect(),
            descriptions: descriptions.into_iter().map(|d| (d.name.clone(), d)).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn list_clusters(&self, limit: usize) -> Result<Vec<ClusterId>> {
        if self.fail_listing {
            return Err(anyhow!("ListClusters failed"));
        }
        Ok(self.listed.iter().take(limit).cloned().collect())
    }

    async fn describe_cluster(&self, cluster: &str) -> Result<ClusterDescription> {
        self.describe_calls.lock().unwrap().push(cluster.to_string());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.describe_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.descriptions
            .get(cluster)
            .cloned()
            .ok_or_else(|| anyhow!("DescribeCluster failed for {}", cluster))
    }
}

#[derive(Clone, Default)]
pub struct FakeOrchestrator {
    pub nodes: Vec<NodeRecord>,
    pub allocated: HashMap<String, i64>,
    pub namespaces: HashMap<String, BTreeMap<String, String>>,
    pub quota_objects: HashMap<String, Value>,
    pub fail_nodes: bool,
    /// `list_nodes` never completes.
    pub hang_nodes: bool,
}

#[async_trait]
impl Orchestrator for FakeOrchestrator {
    async fn list_nodes(&self, _label_selector: &str) -> Result<Vec<NodeRecord>> {
        if self.fail_nodes {
            return Err(anyhow!("node list failed"));
        }
        if self.hang_nodes {
            std::future::pending::<()>().await;
        }
        Ok(self.nodes.clone())
    }

    async fn namespace_labels(&self, namespace: &str) -> Result<Option<BTreeMap<String, String>>> {
        Ok(self.namespaces.get(namespace).cloned())
    }

    async fn quota_object(&self, quota_group: &str) -> Result<Option<Value>> {
        Ok(self.quota_objects.get(quota_group).cloned())
    }

    async fn allocated_accelerators_by_node(&self) -> Result<HashMap<String, i64>> {
        Ok(self.allocated.clone())
    }
}

/// Access keyed by EKS cluster ARN; records every handle it materializes.
#[derive(Default)]
pub struct FakeAccess {
    pub orchestrators: HashMap<String, FakeOrchestrator>,
    pub materialized: Mutex<Vec<AccessHandle>>,
    bindings: Mutex<HashMap<std::path::PathBuf, String>>,
}

impl FakeAccess {
    pub fn with(orchestrators: Vec<(&str, FakeOrchestrator)>) -> Self {
        Self {
            orchestrators: orchestrators
                .into_iter()
                .map(|(cluster, o)| (eks_arn(cluster), o))
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ClusterAccess for FakeAccess {
    async fn materialize(
        &self,
        orchestrator: &OrchestratorRef,
        handle: &AccessHandle,
    ) -> Result<()> {
        if !self.orchestrators.contains_key(&orchestrator.eks_cluster_arn) {
            return Err(anyhow!("no such EKS cluster {}", orchestrator.eks_cluster_arn));
        }
        self.materialized.lock().unwrap().push(handle.clone());
        self.bindings.lock().unwrap().insert(
            handle.kubeconfig().to_path_buf(),
            orchestrator.eks_cluster_arn.clone(),
        );
        Ok(())
    }

    async fn connect(&self, handle: &AccessHandle) -> Result<Box<dyn Orchestrator>> {
        let arn = self
            .bindings
            .lock()
            .unwrap()
            .get(handle.kubeconfig())
            .cloned()
            .ok_or_else(|| anyhow!("access not materialized for {}", handle.cluster()))?;
        Ok(Box::new(self.orchestrators[&arn].clone()))
    }
}
