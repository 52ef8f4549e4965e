//! Target cluster resolution.

use tracing::{debug, warn};

use crate::capacity::types::ClusterId;
use crate::capacity::upstream::ControlPlane;
use crate::error::CollectError;

/// Maximum number of clusters sampled per run.
pub const MAX_CLUSTERS: usize = 50;

/// Resolve the ordered list of clusters to sample.
///
/// An explicit list is used as given (duplicates removed). Otherwise every
/// cluster visible to the caller is listed. Either way at most
/// [`MAX_CLUSTERS`] are returned; a listing failure is fatal.
pub async fn discover_clusters(
    control_plane: &dyn ControlPlane,
    explicit: Option<&[ClusterId]>,
) -> Result<Vec<ClusterId>, CollectError> {
    let mut clusters = match explicit {
        Some(names) => {
            let mut unique: Vec<ClusterId> = Vec::with_capacity(names.len());
            for name in names {
                if !name.is_empty() && !unique.contains(name) {
                    unique.push(name.clone());
                }
            }
            if unique.len() > MAX_CLUSTERS {
                warn!(
                    "{} clusters requested, only the first {} will be sampled",
                    unique.len(),
                    MAX_CLUSTERS
                );
            }
            unique
        }
        None => control_plane
            .list_clusters(MAX_CLUSTERS)
            .await
            .map_err(CollectError::Fatal)?,
    };

    clusters.truncate(MAX_CLUSTERS);
    debug!("Discovered {} clusters: {:?}", clusters.len(), clusters);
    Ok(clusters)
}
