//! Interfaces to the control plane and to each cluster's orchestrator.
//!
//! The AWS and Kubernetes implementations live in `crate::aws` and
//! `crate::k8s`; tests substitute in-memory fakes.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

use crate::capacity::types::{ClusterId, NodeRecord};
use crate::error::HypcapError;

/// Instance group of a cluster and its current running count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceGroupCount {
    pub name: String,
    pub instance_type: String,
    pub current_count: u32,
}

/// Reference to the EKS cluster orchestrating a HyperPod cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorRef {
    pub eks_cluster_arn: String,
}

impl OrchestratorRef {
    /// EKS cluster name from an ARN like `arn:aws:eks:<region>:<account>:cluster/<name>`.
    pub fn eks_cluster_name(&self) -> Result<&str> {
        self.eks_cluster_arn
            .rsplit_once(":cluster/")
            .map(|(_, name)| name)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                HypcapError::OrchestratorNotFound(format!(
                    "malformed EKS cluster ARN '{}'",
                    self.eks_cluster_arn
                ))
                .into()
            })
    }
}

/// Control plane view of one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterDescription {
    pub name: ClusterId,
    pub instance_groups: Vec<InstanceGroupCount>,
    pub orchestrator: Option<OrchestratorRef>,
}

impl ClusterDescription {
    pub fn current_instance_count(&self) -> u64 {
        self.instance_groups
            .iter()
            .map(|g| u64::from(g.current_count))
            .sum()
    }
}

/// Cluster-scoped access location, unique per cluster.
///
/// Created once per fetch and passed down by reference, so concurrent
/// workers never share a credentials path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessHandle {
    cluster: ClusterId,
    kubeconfig: PathBuf,
}

impl AccessHandle {
    pub fn for_cluster(dir: &Path, cluster: &str) -> Self {
        let file_name: String = cluster
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        Self {
            cluster: cluster.to_string(),
            kubeconfig: dir.join(format!("{}.kubeconfig", file_name)),
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn kubeconfig(&self) -> &Path {
        &self.kubeconfig
    }
}

/// Cluster listing and description.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// List cluster names visible to the caller, at most `limit`.
    async fn list_clusters(&self, limit: usize) -> Result<Vec<ClusterId>>;

    async fn describe_cluster(&self, cluster: &str) -> Result<ClusterDescription>;
}

/// Materializes and opens per-cluster orchestrator access.
#[async_trait]
pub trait ClusterAccess: Send + Sync {
    /// Write access material for `orchestrator` at `handle`.
    async fn materialize(
        &self,
        orchestrator: &OrchestratorRef,
        handle: &AccessHandle,
    ) -> Result<()>;

    /// Open an orchestrator session from previously materialized access.
    async fn connect(&self, handle: &AccessHandle) -> Result<Box<dyn Orchestrator>>;
}

/// Read-only orchestrator queries used by the capacity fetch.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn list_nodes(&self, label_selector: &str) -> Result<Vec<NodeRecord>>;

    /// Namespace labels, or `None` if the namespace does not exist.
    async fn namespace_labels(&self, namespace: &str) -> Result<Option<BTreeMap<String, String>>>;

    /// Raw quota-manager object, or `None` if it does not exist.
    async fn quota_object(&self, quota_group: &str) -> Result<Option<serde_json::Value>>;

    async fn allocated_accelerators_by_node(&self) -> Result<HashMap<String, i64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eks_cluster_name_from_arn() {
        let orchestrator = OrchestratorRef {
            eks_cluster_arn: "arn:aws:eks:us-west-2:123456789012:cluster/hyperpod-eks".to_string(),
        };
        assert_eq!(orchestrator.eks_cluster_name().unwrap(), "hyperpod-eks");
    }

    #[test]
    fn test_eks_cluster_name_malformed_arn() {
        let orchestrator = OrchestratorRef {
            eks_cluster_arn: "not-an-arn".to_string(),
        };
        assert!(orchestrator.eks_cluster_name().is_err());
    }

    #[test]
    fn test_current_instance_count() {
        let description = ClusterDescription {
            name: "ml-cluster".to_string(),
            instance_groups: vec![
                InstanceGroupCount {
                    name: "workers".to_string(),
                    instance_type: "ml.p5.48xlarge".to_string(),
                    current_count: 4,
                },
                InstanceGroupCount {
                    name: "controller".to_string(),
                    instance_type: "ml.c5.xlarge".to_string(),
                    current_count: 1,
                },
            ],
            orchestrator: None,
        };
        assert_eq!(description.current_instance_count(), 5);
    }

    #[test]
    fn test_access_handles_unique_per_cluster() {
        let dir = Path::new("/tmp/hypcap");
        let a = AccessHandle::for_cluster(dir, "cluster-a");
        let b = AccessHandle::for_cluster(dir, "cluster-b");

        assert_ne!(a.kubeconfig(), b.kubeconfig());
        assert_eq!(a.kubeconfig(), Path::new("/tmp/hypcap/cluster-a.kubeconfig"));
        assert_eq!(a.cluster(), "cluster-a");
    }

    #[test]
    fn test_access_handle_sanitizes_path_separators() {
        let handle = AccessHandle::for_cluster(Path::new("/tmp/hypcap"), "../evil/name");
        assert_eq!(
            handle.kubeconfig(),
            Path::new("/tmp/hypcap/.._evil_name.kubeconfig")
        );
    }
}
