//! Capacity data model shared by the collector, aggregators and output.

use std::fmt;

use serde::{Serialize, Serializer};

/// Name of a managed HyperPod cluster.
pub type ClusterId = String;

/// Placeholder rendered for values that are unknown or not applicable.
pub const NOT_APPLICABLE: &str = "N/A";

/// Accelerator-bearing instance families and the extended resource they expose.
const ACCELERATOR_FAMILIES: &[(&str, &str)] = &[
    ("ml.p", "nvidia.com/gpu"),
    ("ml.g", "nvidia.com/gpu"),
    ("ml.trn", "aws.amazon.com/neurondevice"),
];

/// Every accelerator resource name tracked by quota parsing.
pub const ACCELERATOR_RESOURCES: &[&str] = &["nvidia.com/gpu", "aws.amazon.com/neurondevice"];

/// Resolve the accelerator resource name for an instance type.
///
/// Returns `None` for families without accelerators (e.g. `ml.c5.xlarge`).
pub fn accelerator_resource(instance_type: &str) -> Option<&'static str> {
    ACCELERATOR_FAMILIES
        .iter()
        .find(|(prefix, _)| instance_type.starts_with(prefix))
        .map(|(_, resource)| *resource)
}

/// A count that may be unknown or not applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    Known(i64),
    NotApplicable,
}

impl Count {
    pub fn value(self) -> Option<i64> {
        match self {
            Count::Known(v) => Some(v),
            Count::NotApplicable => None,
        }
    }
}

impl From<Option<i64>> for Count {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Count::NotApplicable, Count::Known)
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Count::Known(v) => write!(f, "{}", v),
            Count::NotApplicable => f.write_str(NOT_APPLICABLE),
        }
    }
}

impl Serialize for Count {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Count::Known(v) => serializer.serialize_i64(*v),
            Count::NotApplicable => serializer.serialize_str(NOT_APPLICABLE),
        }
    }
}

/// Node health as reported by the HyperPod health-monitoring agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Schedulable,
    /// Any `Unschedulable*` value, e.g. `UnschedulablePendingReboot`.
    Unschedulable(String),
    Unexpected(String),
    Missing,
}

impl HealthStatus {
    pub fn from_label(value: Option<&str>) -> Self {
        match value {
            Some("Schedulable") => HealthStatus::Schedulable,
            Some(v) if v.starts_with("Unschedulable") => HealthStatus::Unschedulable(v.to_string()),
            Some(v) => HealthStatus::Unexpected(v.to_string()),
            None => HealthStatus::Missing,
        }
    }
}

/// One fleet node, as sampled by a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub name: String,
    pub instance_type: String,
    pub health: HealthStatus,
    /// Deep health check label value; `None` when the label is absent.
    pub deep_health_check: Option<String>,
    /// Allocatable accelerators; `None` for non-accelerator families.
    pub accelerator_allocatable: Option<i64>,
}

/// Per `(cluster, instance type)` node health and capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceTypeSummary {
    pub cluster: ClusterId,
    pub instance_type: String,
    pub total_nodes: u32,
    pub schedulable_nodes: u32,
    pub unschedulable_nodes: u32,
    pub deep_health_check_passed: Count,
    pub accelerators_available: Count,
}

impl InstanceTypeSummary {
    /// Row emitted for a cluster with no running instances.
    pub fn empty_cluster(cluster: &str) -> Self {
        Self {
            cluster: cluster.to_string(),
            instance_type: NOT_APPLICABLE.to_string(),
            total_nodes: 0,
            schedulable_nodes: 0,
            unschedulable_nodes: 0,
            deep_health_check_passed: Count::NotApplicable,
            accelerators_available: Count::Known(0),
        }
    }
}

/// Accelerator quota of one namespace on one instance type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceQuota {
    pub namespace: String,
    pub nominal: Count,
    pub used: Count,
    pub available: Count,
}

impl NamespaceQuota {
    pub fn new(namespace: &str, nominal: Count, used: Count) -> Self {
        let available = Count::from(
            nominal
                .value()
                .zip(used.value())
                .and_then(|(n, u)| n.checked_sub(u)),
        );
        Self {
            namespace: namespace.to_string(),
            nominal,
            used,
            available,
        }
    }

    pub fn not_applicable(namespace: &str) -> Self {
        Self::new(namespace, Count::NotApplicable, Count::NotApplicable)
    }
}

/// One report line: an instance-type summary plus its namespace quota columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityRow {
    pub summary: InstanceTypeSummary,
    /// One entry per requested namespace, in request order.
    pub quotas: Vec<NamespaceQuota>,
}
