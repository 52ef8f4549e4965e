//! Concurrent fan-out of capacity fetches across the fleet.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::capacity::assemble::{CapacityReport, assemble_rows};
use crate::capacity::discovery::discover_clusters;
use crate::capacity::fetch::CapacityFetcher;
use crate::capacity::types::{CapacityRow, ClusterId};
use crate::capacity::upstream::ControlPlane;
use crate::error::CollectError;

/// What to sample.
#[derive(Debug, Clone, Default)]
pub struct CapacityRequest {
    /// Explicit cluster names; `None` samples every visible cluster.
    pub clusters: Option<Vec<ClusterId>>,
}

/// Runs one [`CapacityFetcher`] per cluster on a bounded worker pool.
pub struct CapacityEngine {
    control_plane: Arc<dyn ControlPlane>,
    fetcher: Arc<CapacityFetcher>,
    max_concurrency: usize,
}

impl CapacityEngine {
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        fetcher: Arc<CapacityFetcher>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            control_plane,
            fetcher,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Sample every target cluster and assemble the report.
    ///
    /// Clusters that fail are logged and left out; only discovery failures
    /// are returned as errors.
    pub async fn collect(&self, request: &CapacityRequest) -> Result<CapacityReport, CollectError> {
        let clusters =
            discover_clusters(self.control_plane.as_ref(), request.clusters.as_deref()).await?;
        let requested = clusters.len();

        let workers = self.max_concurrency.min(requested.max(1));
        info!("Sampling {} clusters with {} workers", requested, workers);

        let outcomes: Vec<(usize, Result<Vec<CapacityRow>, CollectError>)> =
            stream::iter(clusters.into_iter().enumerate())
                .map(|(index, cluster)| {
                    let fetcher = Arc::clone(&self.fetcher);
                    async move {
                        let outcome = fetcher
                            .fetch(&cluster)
                            .await
                            .map_err(|cause| CollectError::PerCluster { cluster, cause });
                        (index, outcome)
                    }
                })
                .buffer_unordered(workers)
                .collect()
                .await;

        let mut completed = Vec::with_capacity(outcomes.len());
        for (index, outcome) in outcomes {
            match outcome {
                Ok(rows) => completed.push((index, rows)),
                Err(CollectError::PerCluster { cluster, cause }) => {
                    error!(cluster = %cluster, "Dropping cluster from report: {:#}", cause);
                }
                Err(fatal @ CollectError::Fatal(_)) => return Err(fatal),
            }
        }

        let sampled = completed.iter().filter(|(_, rows)| !rows.is_empty()).count();
        if sampled == 0 {
            warn!("No clusters could be sampled");
        } else {
            debug!("Sampled {}/{} clusters", sampled, requested);
        }

        Ok(CapacityReport {
            namespaces: self.fetcher.namespaces().to_vec(),
            rows: assemble_rows(completed),
        })
    }
}
