//! Merge per-cluster rows into the flat and structured report forms.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::capacity::types::{CapacityRow, ClusterId, Count};

/// Rows of every sampled cluster plus the namespaces that were requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacityReport {
    pub namespaces: Vec<String>,
    pub rows: Vec<CapacityRow>,
}

/// Order completed fetches by discovery index and flatten them.
///
/// Input arrives in completion order; the output only depends on the
/// discovery order and each cluster's own rows.
pub fn assemble_rows(mut completed: Vec<(usize, Vec<CapacityRow>)>) -> Vec<CapacityRow> {
    completed.sort_by_key(|(index, _)| *index);
    completed.into_iter().flat_map(|(_, rows)| rows).collect()
}

/// Column headers shared by every table row.
pub const BASE_COLUMNS: &[&str] = &[
    "Cluster",
    "InstanceType",
    "TotalNodes",
    "AcceleratorDevicesAvailable",
    "NodeHealthStatus=Schedulable",
    "NodeHealthStatus=Unschedulable",
    "DeepHealthCheckStatus=Passed",
];

/// Report flattened into string cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CapacityReport {
    pub fn flat_table(&self) -> FlatTable {
        let mut headers: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
        for namespace in &self.namespaces {
            headers.push(format!("{} TotalAcceleratorDevices", namespace));
            headers.push(format!("{} AvailableAcceleratorDevices", namespace));
        }

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let s = &row.summary;
                let mut cells = vec![
                    s.cluster.clone(),
                    s.instance_type.clone(),
                    s.total_nodes.to_string(),
                    s.accelerators_available.to_string(),
                    s.schedulable_nodes.to_string(),
                    s.unschedulable_nodes.to_string(),
                    s.deep_health_check_passed.to_string(),
                ];
                for quota in &row.quotas {
                    cells.push(quota.nominal.to_string());
                    cells.push(quota.available.to_string());
                }
                cells
            })
            .collect();

        FlatTable { headers, rows }
    }

    /// Group rows per cluster, with quota columns nested under `Namespaces`.
    pub fn structured(&self) -> BTreeMap<ClusterId, ClusterView> {
        let mut clusters: BTreeMap<ClusterId, ClusterView> = BTreeMap::new();

        for row in &self.rows {
            let s = &row.summary;
            let namespaces = row
                .quotas
                .iter()
                .map(|q| {
                    (
                        q.namespace.clone(),
                        NamespaceView {
                            total_accelerator_devices: q.nominal,
                            available_accelerator_devices: q.available,
                        },
                    )
                })
                .collect();

            clusters
                .entry(s.cluster.clone())
                .or_default()
                .instances
                .push(InstanceView {
                    instance_type: s.instance_type.clone(),
                    total_nodes: s.total_nodes,
                    accelerator_devices_available: s.accelerators_available,
                    schedulable_nodes: s.schedulable_nodes,
                    unschedulable_nodes: s.unschedulable_nodes,
                    deep_health_check_passed: s.deep_health_check_passed,
                    namespaces,
                });
        }

        clusters
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterView {
    #[serde(rename = "Instances")]
    pub instances: Vec<InstanceView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceView {
    #[serde(rename = "InstanceType")]
    pub instance_type: String,
    #[serde(rename = "TotalNodes")]
    pub total_nodes: u32,
    #[serde(rename = "AcceleratorDevicesAvailable")]
    pub accelerator_devices_available: Count,
    #[serde(rename = "NodeHealthStatus=Schedulable")]
    pub schedulable_nodes: u32,
    #[serde(rename = "NodeHealthStatus=Unschedulable")]
    pub unschedulable_nodes: u32,
    #[serde(rename = "DeepHealthCheckStatus=Passed")]
    pub deep_health_check_passed: Count,
    #[serde(rename = "Namespaces", skip_serializing_if = "BTreeMap::is_empty")]
    pub namespaces: BTreeMap<String, NamespaceView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NamespaceView {
    #[serde(rename = "TotalAcceleratorDevices")]
    pub total_accelerator_devices: Count,
    #[serde(rename = "AvailableAcceleratorDevices")]
    pub available_accelerator_devices: Count,
}
