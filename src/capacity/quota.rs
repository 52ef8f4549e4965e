//! Namespace quota resolution from Kueue `ClusterQueue` objects.
//!
//! A quota-managed namespace carries the quota allocation label; the
//! allocation id names the `ClusterQueue` holding its nominal quota
//! (`spec.resourceGroups[].flavors[]`) and usage (`status.flavorsUsage[]`).
//! Flavors are named after instance types.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tracing::debug;

use crate::capacity::types::{ACCELERATOR_RESOURCES, Count, NamespaceQuota, accelerator_resource};

/// Namespace label naming the quota allocation managed by HyperPod task governance.
pub const QUOTA_ALLOCATION_LABEL: &str = "sagemaker.amazonaws.com/quota-allocation-id";

/// Derive the quota group (ClusterQueue name) from namespace labels.
///
/// Returns `None` when the namespace is not quota-managed.
pub fn quota_group_for(labels: &BTreeMap<String, String>) -> Option<String> {
    labels
        .get(QUOTA_ALLOCATION_LABEL)
        .filter(|id| !id.is_empty())
        .map(|id| format!("hyperpod-ns-{}-clusterqueue", id))
}

/// Raw nominal and used quota keyed by `(flavor, resource)`.
///
/// Values are kept unparsed so a malformed entry only affects its own column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuotaTable {
    nominal: HashMap<(String, String), Value>,
    used: HashMap<(String, String), Value>,
}

impl QuotaTable {
    /// Parse a ClusterQueue object (its full JSON body).
    pub fn from_cluster_queue(object: &Value) -> Self {
        let mut table = QuotaTable::default();

        let resource_groups = object
            .get("spec")
            .and_then(|s| s.get("resourceGroups"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for group in resource_groups {
            for flavor in array_at(group, "flavors") {
                collect_flavor(flavor, "nominalQuota", &mut table.nominal);
            }
        }

        let usage = object
            .get("status")
            .and_then(|s| s.get("flavorsUsage"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for flavor in usage {
            collect_flavor(flavor, "total", &mut table.used);
        }

        debug!(
            "Parsed quota table: {} nominal entries, {} usage entries",
            table.nominal.len(),
            table.used.len()
        );
        table
    }

    pub fn is_empty(&self) -> bool {
        self.nominal.is_empty() && self.used.is_empty()
    }

    /// Resolve accelerator quota of `namespace` on `instance_type`.
    pub fn resolve(&self, namespace: &str, instance_type: &str) -> NamespaceQuota {
        let Some(resource) = accelerator_resource(instance_type) else {
            return NamespaceQuota::not_applicable(namespace);
        };
        let key = (instance_type.to_string(), resource.to_string());

        let nominal = Count::from(self.nominal.get(&key).and_then(parse_quantity));
        let used = Count::from(self.used.get(&key).and_then(parse_quantity));
        NamespaceQuota::new(namespace, nominal, used)
    }
}

fn array_at<'a>(value: &'a Value, field: &str) -> &'a [Value] {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn collect_flavor(flavor: &Value, amount_field: &str, into: &mut HashMap<(String, String), Value>) {
    let Some(flavor_name) = flavor.get("name").and_then(Value::as_str) else {
        return;
    };

    for resource in array_at(flavor, "resources") {
        let Some(resource_name) = resource.get("name").and_then(Value::as_str) else {
            continue;
        };
        if !ACCELERATOR_RESOURCES.contains(&resource_name) {
            continue;
        }
        if let Some(amount) = resource.get(amount_field) {
            into.insert(
                (flavor_name.to_string(), resource_name.to_string()),
                amount.clone(),
            );
        }
    }
}

/// Parse a non-negative integer quantity from a JSON number or string.
fn parse_quantity(value: &Value) -> Option<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|v| *v >= 0)
}
