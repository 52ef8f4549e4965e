//! Namespace labels and Kueue ClusterQueue lookup via the Dynamic API.

use std::collections::BTreeMap;

use anyhow::Result;
use k8s_openapi::api::core::v1::Namespace;
use kube::Api;
use kube::api::{ApiResource, DynamicObject};
use tracing::debug;

use crate::error::HypcapError;

/// ApiResource definition for `kueue.x-k8s.io/v1beta1` ClusterQueue.
fn cluster_queue_api_resource() -> ApiResource {
    ApiResource {
        group: "kueue.x-k8s.io".to_string(),
        version: "v1beta1".to_string(),
        api_version: "kueue.x-k8s.io/v1beta1".to_string(),
        kind: "ClusterQueue".to_string(),
        plural: "clusterqueues".to_string(),
    }
}

/// Labels of `namespace`, or `None` if it does not exist.
pub async fn namespace_labels(
    client: &kube::Client,
    namespace: &str,
) -> Result<Option<BTreeMap<String, String>>> {
    let api: Api<Namespace> = Api::all(client.clone());
    let ns = api
        .get_opt(namespace)
        .await
        .map_err(|e| HypcapError::KubernetesApi(format!("get namespace {}: {}", namespace, e)))?;

    Ok(ns.map(|ns| ns.metadata.labels.unwrap_or_default()))
}

/// Full ClusterQueue body, or `None` if it does not exist.
pub async fn cluster_queue(client: &kube::Client, name: &str) -> Result<Option<serde_json::Value>> {
    let ar = cluster_queue_api_resource();
    let api: Api<DynamicObject> = Api::all_with(client.clone(), &ar);

    let Some(object) = api
        .get_opt(name)
        .await
        .map_err(|e| HypcapError::KubernetesApi(format!("get clusterqueue {}: {}", name, e)))?
    else {
        debug!("ClusterQueue {} not found", name);
        return Ok(None);
    };

    Ok(Some(serde_json::to_value(&object)?))
}
