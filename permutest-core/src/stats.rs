//! Cluster-level statistics.

use crate::{
    field::{FieldError, StatMap},
    spatio_temporal::Cluster,
};

/// Sums `stat_map` over each cluster's member cells.
///
/// The output order matches the input cluster order; the function has no
/// side effects.
///
/// # Errors
/// Returns [`FieldError::CellOutOfBounds`] when a cluster references a cell
/// outside `stat_map`, which indicates the clusters were derived from a
/// differently shaped grid.
///
/// # Examples
/// ```
/// use permutest_core::{
///     ConnectedComponents, MaskedSpatioTemporalGraph, SignMask, SpatialAdjacency, StatMap,
///     cluster_level_stats,
/// };
///
/// let adjacency = SpatialAdjacency::from_links(2, &[(0, 1)])?;
/// let mask = SignMask::from_cells(1, 2, vec![1, 1])?;
/// let graph = MaskedSpatioTemporalGraph::build(&adjacency, &mask)?;
/// let components = ConnectedComponents::new(graph.graph());
/// let clusters = graph.components_to_matrix(&components.components())?;
///
/// let map = StatMap::from_values(1, 2, vec![2.5, 3.0])?;
/// assert_eq!(cluster_level_stats(&map, &clusters)?, vec![5.5]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn cluster_level_stats(
    stat_map: &StatMap,
    clusters: &[Cluster],
) -> Result<Vec<f64>, FieldError> {
    clusters
        .iter()
        .map(|cluster| {
            let mut total = 0.0;
            for (i_time, i_space) in cluster.cells() {
                total += stat_map.get(i_time, i_space)?;
            }
            Ok(total)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::{
        components::ConnectedComponents, field::FieldErrorCode, field::SignMask,
        adjacency::SpatialAdjacency, spatio_temporal::MaskedSpatioTemporalGraph,
    };

    use super::*;

    #[test]
    fn sums_each_cluster_in_order() {
        // Two opposite-sign regions on a 2-site chain; each becomes its own
        // cluster and the sums are hand-checked.
        let adjacency = SpatialAdjacency::from_links(2, &[(0, 1)]).expect("link in range");
        let mask = SignMask::from_cells(2, 2, vec![1, 1, -1, -1]).expect("valid shape");
        let graph = MaskedSpatioTemporalGraph::build(&adjacency, &mask).expect("active mask");
        let components = ConnectedComponents::new(graph.graph());
        let clusters = graph
            .components_to_matrix(&components.components())
            .expect("vertices in range");

        let map =
            StatMap::from_values(2, 2, vec![3.0, 4.0, -2.0, -5.0]).expect("valid shape");
        let stats = cluster_level_stats(&map, &clusters).expect("cells in range");
        assert_eq!(stats, vec![7.0, -7.0]);
    }

    #[test]
    fn empty_cluster_list_yields_empty_stats() {
        let map = StatMap::zeros(2, 2).expect("valid shape");
        assert!(cluster_level_stats(&map, &[]).expect("no clusters").is_empty());
    }

    #[test]
    fn mismatched_grid_is_rejected() {
        let adjacency = SpatialAdjacency::from_links(2, &[(0, 1)]).expect("link in range");
        let mask = SignMask::from_cells(2, 2, vec![1, 1, 1, 1]).expect("valid shape");
        let graph = MaskedSpatioTemporalGraph::build(&adjacency, &mask).expect("active mask");
        let components = ConnectedComponents::new(graph.graph());
        let clusters = graph
            .components_to_matrix(&components.components())
            .expect("vertices in range");

        let narrow = StatMap::zeros(1, 2).expect("valid shape");
        let err = cluster_level_stats(&narrow, &clusters).expect_err("grid too small");
        assert_eq!(err.code(), FieldErrorCode::CellOutOfBounds);
    }
}
