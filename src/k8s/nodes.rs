//! Fleet node listing and accelerator allocation per node.

use std::collections::HashMap;

use anyhow::Result;
use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::Api;
use kube::api::ListParams;
use tracing::debug;

use crate::capacity::types::{ACCELERATOR_RESOURCES, HealthStatus, NodeRecord, accelerator_resource};
use crate::error::HypcapError;

const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";
const HEALTH_STATUS_LABEL: &str = "sagemaker.amazonaws.com/node-health-status";
const DEEP_HEALTH_CHECK_LABEL: &str = "sagemaker.amazonaws.com/deep-health-check-status";

/// Pods that still hold their resources.
const ACTIVE_POD_FIELD_SELECTOR: &str = "status.phase!=Succeeded,status.phase!=Failed";

/// List nodes matching `label_selector` as fleet node records.
pub async fn list_fleet_nodes(
    client: &kube::Client,
    label_selector: &str,
) -> Result<Vec<NodeRecord>> {
    let api: Api<Node> = Api::all(client.clone());
    let list = api
        .list(&ListParams::default().labels(label_selector))
        .await
        .map_err(|e| HypcapError::KubernetesApi(format!("list nodes: {}", e)))?;

    debug!("Found {} nodes matching {}", list.items.len(), label_selector);
    Ok(list.items.iter().map(node_record).collect())
}

/// Sum accelerator requests of active pods, keyed by node name.
pub async fn allocated_by_node(client: &kube::Client) -> Result<HashMap<String, i64>> {
    let api: Api<Pod> = Api::all(client.clone());
    let list = api
        .list(&ListParams::default().fields(ACTIVE_POD_FIELD_SELECTOR))
        .await
        .map_err(|e| HypcapError::KubernetesApi(format!("list pods: {}", e)))?;

    debug!("Found {} active pods", list.items.len());
    Ok(sum_allocated(&list.items))
}

pub fn node_record(node: &Node) -> NodeRecord {
    let instance_type = label(node, INSTANCE_TYPE_LABEL).unwrap_or("unknown").to_string();
    let accelerator_allocatable = accelerator_resource(&instance_type).map(|resource| {
        node.status
            .as_ref()
            .and_then(|s| s.allocatable.as_ref())
            .and_then(|a| a.get(resource))
            .and_then(parse_count)
            .unwrap_or(0)
    });

    NodeRecord {
        name: node.metadata.name.clone().unwrap_or_default(),
        health: HealthStatus::from_label(label(node, HEALTH_STATUS_LABEL)),
        deep_health_check: label(node, DEEP_HEALTH_CHECK_LABEL).map(str::to_string),
        instance_type,
        accelerator_allocatable,
    }
}

fn label<'a>(node: &'a Node, key: &str) -> Option<&'a str> {
    node.metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(key))
        .map(String::as_str)
}

/// Container requests take precedence over limits, per resource.
pub fn sum_allocated(pods: &[Pod]) -> HashMap<String, i64> {
    let mut allocated: HashMap<String, i64> = HashMap::new();

    for pod in pods {
        let Some(spec) = pod.spec.as_ref() else {
            continue;
        };
        let Some(node_name) = spec.node_name.as_ref() else {
            continue;
        };

        let mut total: i64 = 0;
        for container in &spec.containers {
            let Some(resources) = container.resources.as_ref() else {
                continue;
            };
            for resource in ACCELERATOR_RESOURCES {
                let amount = resources
                    .requests
                    .as_ref()
                    .and_then(|r| r.get(*resource))
                    .or_else(|| resources.limits.as_ref().and_then(|l| l.get(*resource)))
                    .and_then(parse_count);
                total = total.saturating_add(amount.unwrap_or(0));
            }
        }

        if total > 0 {
            let entry = allocated.entry(node_name.clone()).or_insert(0);
            *entry = entry.saturating_add(total);
        }
    }

    allocated
}

/// Parse an integral device count (`"8"`, or milli units like `"8000m"`).
fn parse_count(quantity: &Quantity) -> Option<i64> {
    let raw = quantity.0.trim();
    let count = match raw.strip_suffix('m') {
        Some(milli) => milli.parse::<i64>().ok().map(|v| v / 1000),
        None => raw.parse().ok(),
    };
    count.filter(|v| *v >= 0)
}
