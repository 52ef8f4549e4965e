//! Orchestrator session over one EKS cluster.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;

use crate::capacity::types::NodeRecord;
use crate::capacity::upstream::Orchestrator;
use crate::k8s::{nodes, quota};

/// [`Orchestrator`] backed by a `kube::Client`.
#[derive(Clone)]
pub struct KubeOrchestrator {
    client: kube::Client,
}

impl KubeOrchestrator {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Orchestrator for KubeOrchestrator {
    async fn list_nodes(&self, label_selector: &str) -> Result<Vec<NodeRecord>> {
        nodes::list_fleet_nodes(&self.client, label_selector).await
    }

    async fn namespace_labels(&self, namespace: &str) -> Result<Option<BTreeMap<String, String>>> {
        quota::namespace_labels(&self.client, namespace).await
    }

    async fn quota_object(&self, quota_group: &str) -> Result<Option<serde_json::Value>> {
        quota::cluster_queue(&self.client, quota_group).await
    }

    async fn allocated_accelerators_by_node(&self) -> Result<HashMap<String, i64>> {
        nodes::allocated_by_node(&self.client).await
    }
}
