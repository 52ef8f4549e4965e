//! Reduce a cluster's node list into per-instance-type summaries.

use std::collections::{BTreeMap, HashMap};

use crate::capacity::types::{
    Count, HealthStatus, InstanceTypeSummary, NodeRecord, accelerator_resource,
};
use crate::error::HypcapError;

/// Deep health check label value counted as a pass.
const DEEP_HEALTH_CHECK_PASSED: &str = "Passed";

#[derive(Default)]
struct Tally {
    total: u32,
    schedulable: u32,
    unschedulable: u32,
    deep_health_passed: i64,
    deep_health_unknown: bool,
    accelerators: i64,
    accelerators_overflowed: bool,
}

/// Summarize nodes per instance type, ordered by instance type.
///
/// `allocated` maps node name to accelerators claimed by running workloads.
/// A node whose health label is neither `Schedulable` nor `Unschedulable*`
/// fails the whole cluster.
///
/// Available accelerators are not clamped at zero: allocation and allocatable
/// are sampled separately, so a negative total means the samples overlapped.
pub fn summarize_nodes(
    cluster: &str,
    nodes: &[NodeRecord],
    allocated: &HashMap<String, i64>,
) -> Result<Vec<InstanceTypeSummary>, HypcapError> {
    let mut tallies: BTreeMap<&str, Tally> = BTreeMap::new();

    for node in nodes {
        let tally = tallies.entry(node.instance_type.as_str()).or_default();
        tally.total += 1;

        let schedulable = match &node.health {
            HealthStatus::Schedulable => {
                tally.schedulable += 1;
                true
            }
            HealthStatus::Unschedulable(_) => {
                tally.unschedulable += 1;
                false
            }
            HealthStatus::Unexpected(status) => {
                return Err(HypcapError::UnexpectedHealthStatus {
                    node: node.name.clone(),
                    status: status.clone(),
                });
            }
            HealthStatus::Missing => {
                return Err(HypcapError::UnexpectedHealthStatus {
                    node: node.name.clone(),
                    status: "<missing>".to_string(),
                });
            }
        };

        match node.deep_health_check.as_deref() {
            Some(DEEP_HEALTH_CHECK_PASSED) => tally.deep_health_passed += 1,
            Some(_) => {}
            None => tally.deep_health_unknown = true,
        }

        if schedulable {
            let claimed = allocated.get(&node.name).copied().unwrap_or(0);
            match tally
                .accelerators
                .checked_add(node.accelerator_allocatable.unwrap_or(0))
                .and_then(|total| total.checked_sub(claimed))
            {
                Some(total) => tally.accelerators = total,
                None => tally.accelerators_overflowed = true,
            }
        }
    }

    Ok(tallies
        .into_iter()
        .map(|(instance_type, tally)| InstanceTypeSummary {
            cluster: cluster.to_string(),
            instance_type: instance_type.to_string(),
            total_nodes: tally.total,
            schedulable_nodes: tally.schedulable,
            unschedulable_nodes: tally.unschedulable,
            deep_health_check_passed: if tally.deep_health_unknown {
                Count::NotApplicable
            } else {
                Count::Known(tally.deep_health_passed)
            },
            accelerators_available: match accelerator_resource(instance_type) {
                Some(_) if !tally.accelerators_overflowed => Count::Known(tally.accelerators),
                _ => Count::NotApplicable,
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(
        name: &str,
        instance_type: &str,
        health: &str,
        deep_health: Option<&str>,
        allocatable: Option<i64>,
    ) -> NodeRecord {
        NodeRecord {
            name: name.to_string(),
            instance_type: instance_type.to_string(),
            health: HealthStatus::from_label(Some(health)),
            deep_health_check: deep_health.map(String::from),
            accelerator_allocatable: allocatable,
        }
    }

    #[test]
    fn test_schedulable_and_unschedulable_p4d() {
        let nodes = vec![
            node("n1", "ml.p4d.24xlarge", "Schedulable", Some("Passed"), Some(8)),
            node("n2", "ml.p4d.24xlarge", "Unschedulable", Some("Passed"), Some(8)),
        ];
        let allocated = HashMap::from([("n1".to_string(), 3), ("n2".to_string(), 8)]);

        let summaries = summarize_nodes("A", &nodes, &allocated).unwrap();
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.cluster, "A");
        assert_eq!(s.total_nodes, 2);
        assert_eq!(s.schedulable_nodes, 1);
        assert_eq!(s.unschedulable_nodes, 1);
        assert_eq!(s.accelerators_available, Count::Known(5));
        assert_eq!(s.deep_health_check_passed, Count::Known(2));
    }

    #[test]
    fn test_node_counts_always_add_up() {
        let nodes = vec![
            node("a", "ml.g5.xlarge", "Schedulable", None, Some(1)),
            node("b", "ml.g5.xlarge", "UnschedulablePendingReboot", None, Some(1)),
            node("c", "ml.g5.xlarge", "UnschedulablePendingReplacement", None, Some(1)),
            node("d", "ml.c5.xlarge", "Schedulable", None, None),
        ];

        let summaries = summarize_nodes("A", &nodes, &HashMap::new()).unwrap();
        for s in &summaries {
            assert_eq!(s.schedulable_nodes + s.unschedulable_nodes, s.total_nodes);
        }
    }

    #[test]
    fn test_summaries_ordered_by_instance_type() {
        let nodes = vec![
            node("a", "ml.p5.48xlarge", "Schedulable", None, Some(8)),
            node("b", "ml.c5.xlarge", "Schedulable", None, None),
            node("c", "ml.g5.xlarge", "Schedulable", None, Some(1)),
        ];

        let summaries = summarize_nodes("A", &nodes, &HashMap::new()).unwrap();
        let types: Vec<&str> = summaries.iter().map(|s| s.instance_type.as_str()).collect();
        assert_eq!(types, vec!["ml.c5.xlarge", "ml.g5.xlarge", "ml.p5.48xlarge"]);
    }

    #[test]
    fn test_deep_health_check_absent_on_one_node_collapses_group() {
        let nodes = vec![
            node("a", "ml.g5.xlarge", "Schedulable", Some("Passed"), Some(1)),
            node("b", "ml.g5.xlarge", "Schedulable", None, Some(1)),
            node("c", "ml.p5.48xlarge", "Schedulable", Some("Passed"), Some(8)),
            node("d", "ml.p5.48xlarge", "Schedulable", Some("Failed"), Some(8)),
        ];

        let summaries = summarize_nodes("A", &nodes, &HashMap::new()).unwrap();
        assert_eq!(summaries[0].instance_type, "ml.g5.xlarge");
        assert_eq!(summaries[0].deep_health_check_passed, Count::NotApplicable);
        assert_eq!(summaries[1].instance_type, "ml.p5.48xlarge");
        assert_eq!(summaries[1].deep_health_check_passed, Count::Known(1));
    }

    #[test]
    fn test_non_accelerator_family_is_not_applicable() {
        let nodes = vec![node("a", "ml.c5.xlarge", "Schedulable", None, None)];

        let summaries = summarize_nodes("A", &nodes, &HashMap::new()).unwrap();
        assert_eq!(summaries[0].accelerators_available, Count::NotApplicable);
    }

    #[test]
    fn test_trainium_accelerators_counted() {
        let nodes = vec![
            node("a", "ml.trn1.32xlarge", "Schedulable", None, Some(16)),
            node("b", "ml.trn1.32xlarge", "Schedulable", None, Some(16)),
        ];
        let allocated = HashMap::from([("b".to_string(), 4)]);

        let summaries = summarize_nodes("A", &nodes, &allocated).unwrap();
        assert_eq!(summaries[0].accelerators_available, Count::Known(28));
    }

    #[test]
    fn test_overlapping_samples_go_negative() {
        let nodes = vec![node("a", "ml.g5.xlarge", "Schedulable", None, Some(1))];
        let allocated = HashMap::from([("a".to_string(), 2)]);

        let summaries = summarize_nodes("A", &nodes, &allocated).unwrap();
        assert_eq!(summaries[0].accelerators_available, Count::Known(-1));
    }

    #[test]
    fn test_accelerator_overflow_is_not_applicable() {
        let nodes = vec![
            node("a", "ml.p5.48xlarge", "Schedulable", None, Some(i64::MAX)),
            node("b", "ml.p5.48xlarge", "Schedulable", None, Some(8)),
            node("c", "ml.g5.xlarge", "Schedulable", None, Some(1)),
        ];
        let allocated = HashMap::from([("c".to_string(), i64::MAX)]);

        let summaries = summarize_nodes("A", &nodes, &allocated).unwrap();
        assert_eq!(summaries[0].instance_type, "ml.g5.xlarge");
        assert_eq!(summaries[0].accelerators_available, Count::Known(1 - i64::MAX));
        assert_eq!(summaries[1].instance_type, "ml.p5.48xlarge");
        assert_eq!(summaries[1].accelerators_available, Count::NotApplicable);
        assert_eq!(summaries[1].total_nodes, 2);
    }

    #[test]
    fn test_unexpected_health_status_fails() {
        let nodes = vec![
            node("a", "ml.g5.xlarge", "Schedulable", None, Some(1)),
            node("b", "ml.g5.xlarge", "Unexpected", None, Some(1)),
        ];

        let err = summarize_nodes("A", &nodes, &HashMap::new()).unwrap_err();
        assert!(matches!(
            err,
            HypcapError::UnexpectedHealthStatus { ref node, ref status }
                if node == "b" && status == "Unexpected"
        ));
    }

    #[test]
    fn test_missing_health_label_fails() {
        let mut record = node("a", "ml.g5.xlarge", "Schedulable", None, Some(1));
        record.health = HealthStatus::Missing;

        assert!(summarize_nodes("A", &[record], &HashMap::new()).is_err());
    }

    #[test]
    fn test_no_nodes_yields_no_summaries() {
        let summaries = summarize_nodes("A", &[], &HashMap::new()).unwrap();
        assert!(summaries.is_empty());
    }
}
