//! The permutation-test driver.
//!
//! One run is a straight pipeline repeated N+1 times: evaluate the per-cell
//! statistic into a map, threshold the map into a sign mask, project the
//! mask onto a graph, label connected components, sum the statistic over
//! each cluster. The observed pass (identity row order) keeps everything;
//! each permutation pass (a fresh within-group shuffle) keeps only the
//! tail-appropriate extreme cluster statistic, which becomes one entry of
//! the null distribution. Observed cluster statistics are then ranked
//! against the null to yield empirical p-values.
//!
//! Each pass owns its scratch graph and component labelling; nothing is
//! mutated in place across passes, and a failed pass aborts the run before
//! it can contribute a partial entry to any null distribution.

use std::{num::NonZeroUsize, sync::Arc};

use rand::{SeedableRng, rngs::SmallRng};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{
    Result,
    adjacency::SpatialAdjacency,
    components::ConnectedComponents,
    design::DesignTable,
    error::PermutationError,
    field::{StatMap, Tail},
    spatio_temporal::{Cluster, MaskedSpatioTemporalGraph},
    statistic::CellStatistic,
    stats::cluster_level_stats,
};

/// A validated, runnable permutation test.
///
/// Construct through [`crate::PermutationTestBuilder`]; the instance is
/// immutable and reusable across statistics and designs.
#[derive(Debug, Clone)]
pub struct PermutationTest {
    threshold: f64,
    tail: Tail,
    n_permutations: NonZeroUsize,
    seed: u64,
    keys: Option<Vec<Arc<str>>>,
}

impl PermutationTest {
    pub(crate) fn new(
        threshold: f64,
        tail: Tail,
        n_permutations: NonZeroUsize,
        seed: u64,
        keys: Option<Vec<Arc<str>>>,
    ) -> Self {
        Self {
            threshold,
            tail,
            n_permutations,
            seed,
            keys,
        }
    }

    /// Returns the clustering threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns the configured tail.
    #[must_use]
    pub fn tail(&self) -> Tail {
        self.tail
    }

    /// Returns the number of label permutations per run.
    #[must_use]
    pub fn n_permutations(&self) -> NonZeroUsize {
        self.n_permutations
    }

    /// Returns the seed driving the within-group shuffles.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the explicit key selection, if any.
    #[must_use]
    pub fn keys(&self) -> Option<&[Arc<str>]> {
        self.keys.as_deref()
    }

    /// Runs the full observed-plus-permutations pipeline.
    ///
    /// Cells of each statistic map are evaluated in parallel and scattered
    /// back by coordinate; permutation orders are drawn sequentially from
    /// one generator seeded with [`Self::seed`], so a run is reproducible
    /// regardless of worker scheduling.
    ///
    /// # Errors
    /// Returns [`PermutationError::SpaceCountMismatch`] when the statistic
    /// and adjacency disagree on the spatial extent,
    /// [`PermutationError::NoTrackedKeys`] / [`PermutationError::UnknownKey`]
    /// for unusable key selections, and [`PermutationError::Statistic`]
    /// (with the failing cell and permutation index) when the collaborator
    /// statistic fails. Any error aborts the whole run; no partial
    /// permutation reaches a null distribution.
    #[instrument(
        name = "permutest.run",
        err,
        skip(self, statistic, adjacency, design),
        fields(
            statistic = %statistic.name(),
            n_times = statistic.n_times(),
            n_spaces = statistic.n_spaces(),
            design_rows = design.len(),
            groups = design.group_count(),
            n_permutations = %self.n_permutations,
            tail = ?self.tail,
        ),
    )]
    pub fn run<S: CellStatistic>(
        &self,
        statistic: &S,
        adjacency: &SpatialAdjacency,
        design: &DesignTable,
    ) -> Result<PermutationTestReport> {
        if statistic.n_spaces() != adjacency.space_count() {
            return Err(PermutationError::SpaceCountMismatch {
                statistic: Arc::from(statistic.name()),
                statistic_spaces: statistic.n_spaces(),
                adjacency_spaces: adjacency.space_count(),
            });
        }
        let tracked = self.resolve_keys(statistic)?;

        // Observed pass: identity row order, everything retained.
        let order = design.identity_order();
        let maps = evaluate_stat_maps(statistic, &tracked, &order, None)?;
        let mut observed = Vec::with_capacity(tracked.len());
        for map in &maps {
            let pass = self.cluster_pass(adjacency, map)?;
            debug!(clusters = pass.clusters.len(), "observed pass clustered");
            observed.push(pass);
        }

        // Permutation passes: only the extreme cluster statistic survives.
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut nulls = vec![Vec::with_capacity(self.n_permutations.get()); tracked.len()];
        for i_perm in 0..self.n_permutations.get() {
            let order = design.shuffled_order(&mut rng);
            let maps = evaluate_stat_maps(statistic, &tracked, &order, Some(i_perm))?;
            for (key_index, map) in maps.iter().enumerate() {
                let pass = self.cluster_pass(adjacency, map)?;
                nulls[key_index].push(null_extreme(self.tail, &pass.cluster_stats));
            }
        }

        let reports = tracked
            .into_iter()
            .zip(maps)
            .zip(observed)
            .zip(nulls)
            .map(|((((_, key), stat_map), pass), null_distribution)| {
                let p_values = pass
                    .cluster_stats
                    .iter()
                    .map(|&stat| p_value(self.tail, stat, &null_distribution))
                    .collect();
                KeyReport {
                    key,
                    stat_map,
                    clusters: pass.clusters,
                    cluster_stats: pass.cluster_stats,
                    p_values,
                    null_distribution,
                }
            })
            .collect();
        Ok(PermutationTestReport { reports })
    }

    /// Maps the configured key selection onto the statistic's key indices.
    fn resolve_keys<S: CellStatistic>(
        &self,
        statistic: &S,
    ) -> Result<Vec<(usize, Arc<str>)>> {
        let exposed = statistic.keys();
        if exposed.is_empty() {
            return Err(PermutationError::NoTrackedKeys {
                statistic: Arc::from(statistic.name()),
            });
        }
        match &self.keys {
            None => Ok(exposed
                .iter()
                .enumerate()
                .map(|(index, key)| (index, Arc::clone(key)))
                .collect()),
            Some(selection) => selection
                .iter()
                .map(|key| {
                    exposed
                        .iter()
                        .position(|exposed_key| exposed_key.as_ref() == key.as_ref())
                        .map(|index| (index, Arc::clone(key)))
                        .ok_or_else(|| PermutationError::UnknownKey {
                            key: Arc::clone(key),
                            statistic: Arc::from(statistic.name()),
                        })
                })
                .collect(),
        }
    }

    /// Thresholds one map and extracts its clusters and cluster statistics.
    ///
    /// An all-zero mask is the valid empty outcome, not an error.
    fn cluster_pass(
        &self,
        adjacency: &SpatialAdjacency,
        map: &StatMap,
    ) -> Result<ClusterPass> {
        let mask = map.threshold(self.threshold, self.tail);
        if mask.active_count() == 0 {
            return Ok(ClusterPass {
                clusters: Vec::new(),
                cluster_stats: Vec::new(),
            });
        }
        let graph = MaskedSpatioTemporalGraph::build(adjacency, &mask)?;
        let components = ConnectedComponents::new(graph.graph());
        let clusters = graph.components_to_matrix(&components.components())?;
        let cluster_stats = cluster_level_stats(map, &clusters)?;
        Ok(ClusterPass {
            clusters,
            cluster_stats,
        })
    }
}

/// Clusters and cluster-level statistics of one statistic map.
struct ClusterPass {
    clusters: Vec<Cluster>,
    cluster_stats: Vec<f64>,
}

/// Evaluates one statistic map per tracked key under the given row order.
///
/// Cells are evaluated in parallel; results are scattered back into each
/// map keyed by coordinate, so assembly does not depend on completion
/// order.
fn evaluate_stat_maps<S: CellStatistic>(
    statistic: &S,
    tracked: &[(usize, Arc<str>)],
    order: &[usize],
    permutation: Option<usize>,
) -> Result<Vec<StatMap>> {
    let n_times = statistic.n_times();
    let n_spaces = statistic.n_spaces();
    let expected = statistic.keys().len();
    let cells: Vec<Vec<f64>> = (0..n_times * n_spaces)
        .into_par_iter()
        .map(|index| {
            let i_time = index / n_spaces;
            let i_space = index % n_spaces;
            let values = statistic
                .evaluate(i_time, i_space, order)
                .map_err(|error| PermutationError::Statistic {
                    statistic: Arc::from(statistic.name()),
                    i_time,
                    i_space,
                    permutation,
                    error,
                })?;
            if values.len() != expected {
                return Err(PermutationError::KeyCountMismatch {
                    statistic: Arc::from(statistic.name()),
                    got: values.len(),
                    expected,
                });
            }
            Ok(values)
        })
        .collect::<Result<_>>()?;

    tracked
        .iter()
        .map(|&(key_index, _)| {
            let values = cells.iter().map(|cell| cell[key_index]).collect();
            Ok(StatMap::from_values(n_times, n_spaces, values)?)
        })
        .collect()
}

/// Collapses one permutation's cluster statistics to its null-distribution
/// entry: max, min or max-absolute depending on the tail, 0 when the pass
/// produced no clusters.
fn null_extreme(tail: Tail, cluster_stats: &[f64]) -> f64 {
    if cluster_stats.is_empty() {
        return 0.0;
    }
    match tail {
        Tail::Positive => cluster_stats.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Tail::Negative => cluster_stats.iter().copied().fold(f64::INFINITY, f64::min),
        Tail::TwoSided => cluster_stats.iter().map(|stat| stat.abs()).fold(0.0, f64::max),
    }
}

/// Ranks one observed cluster statistic against a null distribution.
///
/// The comparison is strict, so an observed statistic no permutation beat
/// yields 0 — to be read as "less than 1/n_permutations", not literal zero.
fn p_value(tail: Tail, observed: f64, null_distribution: &[f64]) -> f64 {
    let exceeding = null_distribution
        .iter()
        .filter(|&&entry| match tail {
            Tail::Positive => entry > observed,
            Tail::Negative => entry < observed,
            // Two-sided null entries are already absolute extremes.
            Tail::TwoSided => entry > observed.abs(),
        })
        .count();
    exceeding as f64 / null_distribution.len() as f64
}

/// Everything one run produced for one tracked key.
#[derive(Clone, Debug)]
pub struct KeyReport {
    key: Arc<str>,
    stat_map: StatMap,
    clusters: Vec<Cluster>,
    cluster_stats: Vec<f64>,
    p_values: Vec<f64>,
    null_distribution: Vec<f64>,
}

impl KeyReport {
    /// Returns the statistic key this report covers.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the observed statistic map.
    #[must_use]
    pub fn stat_map(&self) -> &StatMap {
        &self.stat_map
    }

    /// Returns the observed clusters in coordinate form.
    ///
    /// Empty when no cell survived the threshold — a valid outcome.
    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Returns the observed cluster-level statistics, in cluster order.
    #[must_use]
    pub fn cluster_stats(&self) -> &[f64] {
        &self.cluster_stats
    }

    /// Returns one empirical p-value per observed cluster, in cluster order.
    ///
    /// A value of 0 means no permutation exceeded the observed statistic;
    /// interpret it as "less than `1 / n_permutations`".
    #[must_use]
    pub fn p_values(&self) -> &[f64] {
        &self.p_values
    }

    /// Returns the full null distribution, one extreme per permutation.
    ///
    /// For [`Tail::TwoSided`] runs the entries are absolute extremes.
    #[must_use]
    pub fn null_distribution(&self) -> &[f64] {
        &self.null_distribution
    }
}

/// Output of one [`PermutationTest::run`], one [`KeyReport`] per tracked
/// key in tracking order.
#[derive(Clone, Debug)]
pub struct PermutationTestReport {
    reports: Vec<KeyReport>,
}

impl PermutationTestReport {
    /// Returns the per-key reports in tracking order.
    #[must_use]
    pub fn key_reports(&self) -> &[KeyReport] {
        &self.reports
    }

    /// Looks up the report for a key by name.
    #[must_use]
    pub fn for_key(&self, key: &str) -> Option<&KeyReport> {
        self.reports.iter().find(|report| report.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::PermutationTestBuilder;
    use crate::statistic::StatisticError;

    use super::*;

    /// Mean difference between two labelled conditions, one measurement per
    /// design row per cell. Labels are taken through the row order, data is
    /// not, so a shuffle relabels fixed data.
    struct MeanDifference {
        keys: Vec<Arc<str>>,
        n_times: usize,
        n_spaces: usize,
        /// `data[cell][row]`, cell index row-major.
        data: Vec<Vec<f64>>,
        /// `true` marks condition A for the row at that design position.
        condition_a: Vec<bool>,
    }

    impl MeanDifference {
        fn new(
            n_times: usize,
            n_spaces: usize,
            data: Vec<Vec<f64>>,
            condition_a: Vec<bool>,
        ) -> Self {
            Self {
                keys: vec![Arc::from("mean_diff")],
                n_times,
                n_spaces,
                data,
                condition_a,
            }
        }
    }

    impl CellStatistic for MeanDifference {
        fn name(&self) -> &str {
            "mean-difference"
        }

        fn n_times(&self) -> usize {
            self.n_times
        }

        fn n_spaces(&self) -> usize {
            self.n_spaces
        }

        fn keys(&self) -> &[Arc<str>] {
            &self.keys
        }

        fn evaluate(
            &self,
            i_time: usize,
            i_space: usize,
            order: &[usize],
        ) -> std::result::Result<Vec<f64>, StatisticError> {
            if order.len() != self.condition_a.len() {
                return Err(StatisticError::OrderLengthMismatch {
                    got: order.len(),
                    expected: self.condition_a.len(),
                });
            }
            let cell = &self.data[i_time * self.n_spaces + i_space];
            let (mut sum_a, mut n_a, mut sum_b, mut n_b) = (0.0, 0usize, 0.0, 0usize);
            for (row, &label_row) in order.iter().enumerate() {
                if self.condition_a[label_row] {
                    sum_a += cell[row];
                    n_a += 1;
                } else {
                    sum_b += cell[row];
                    n_b += 1;
                }
            }
            Ok(vec![sum_a / n_a as f64 - sum_b / n_b as f64])
        }
    }

    /// Four subjects, one A row and one B row each; the A rows carry +2.0
    /// in the effect cells and everything else is zero.
    fn effect_fixture() -> (MeanDifference, SpatialAdjacency, DesignTable) {
        let n_times = 3;
        let n_spaces = 3;
        let condition_a = vec![true, false, true, false, true, false, true, false];
        // Effect block: times {0, 1} at spaces {0, 1}.
        let effect_cells = [(0, 0), (0, 1), (1, 0), (1, 1)];
        let data = (0..n_times * n_spaces)
            .map(|index| {
                let cell = (index / n_spaces, index % n_spaces);
                condition_a
                    .iter()
                    .map(|&is_a| {
                        if is_a && effect_cells.contains(&cell) {
                            2.0
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect();
        let statistic = MeanDifference::new(n_times, n_spaces, data, condition_a);
        let adjacency =
            SpatialAdjacency::from_links(3, &[(0, 1), (1, 2)]).expect("links in range");
        let design = DesignTable::from_rows(
            "subject",
            [
                (0, "s0"),
                (1, "s0"),
                (2, "s1"),
                (3, "s1"),
                (4, "s2"),
                (5, "s2"),
                (6, "s3"),
                (7, "s3"),
            ],
        )
        .expect("rows are non-empty");
        (statistic, adjacency, design)
    }

    #[test]
    fn detects_the_planted_cluster() {
        let (statistic, adjacency, design) = effect_fixture();
        let test = PermutationTestBuilder::new(1.0)
            .with_n_permutations(99)
            .with_seed(17)
            .build()
            .expect("configuration is valid");
        let report = test
            .run(&statistic, &adjacency, &design)
            .expect("run must succeed");

        let key = report.for_key("mean_diff").expect("tracked key");
        assert_eq!(key.clusters().len(), 1);
        assert_eq!(key.clusters()[0].len(), 4);
        // Observed cluster statistic: four cells at mean difference 2.0.
        assert_eq!(key.cluster_stats(), &[8.0]);
        // No relabelling can exceed the fully aligned labelling.
        assert_eq!(key.p_values(), &[0.0]);
        assert_eq!(key.null_distribution().len(), 99);
        assert!(key.p_values().iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn zero_effect_yields_empty_clusters() {
        let (mut statistic, adjacency, design) = effect_fixture();
        // Flatten the data: nothing can cross the threshold.
        for cell in &mut statistic.data {
            cell.iter_mut().for_each(|value| *value = 0.0);
        }
        let test = PermutationTestBuilder::new(1.0)
            .with_n_permutations(10)
            .build()
            .expect("configuration is valid");
        let report = test
            .run(&statistic, &adjacency, &design)
            .expect("run must succeed");
        let key = report.for_key("mean_diff").expect("tracked key");
        assert!(key.clusters().is_empty());
        assert!(key.cluster_stats().is_empty());
        assert!(key.p_values().is_empty());
        assert_eq!(key.null_distribution(), &[0.0; 10]);
    }

    #[test]
    fn identical_seeds_replay_identical_nulls() {
        let (statistic, adjacency, design) = effect_fixture();
        let run = |seed| {
            PermutationTestBuilder::new(1.0)
                .with_n_permutations(25)
                .with_seed(seed)
                .build()
                .expect("configuration is valid")
                .run(&statistic, &adjacency, &design)
                .expect("run must succeed")
        };
        let first = run(5);
        let second = run(5);
        let null = |report: &PermutationTestReport| {
            report.key_reports()[0].null_distribution().to_vec()
        };
        assert_eq!(null(&first), null(&second));
    }

    #[test]
    fn rejects_mismatched_adjacency() {
        let (statistic, _, design) = effect_fixture();
        let narrow = SpatialAdjacency::from_links(2, &[(0, 1)]).expect("links in range");
        let test = PermutationTestBuilder::new(1.0)
            .build()
            .expect("configuration is valid");
        let err = test
            .run(&statistic, &narrow, &design)
            .expect_err("space counts differ");
        assert!(matches!(
            err,
            PermutationError::SpaceCountMismatch {
                statistic_spaces: 3,
                adjacency_spaces: 2,
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_key_selection() {
        let (statistic, adjacency, design) = effect_fixture();
        let test = PermutationTestBuilder::new(1.0)
            .with_keys(["no_such_key"])
            .build()
            .expect("configuration is valid");
        let err = test
            .run(&statistic, &adjacency, &design)
            .expect_err("key is not exposed");
        assert!(matches!(err, PermutationError::UnknownKey { .. }));
    }

    #[test]
    fn statistic_failure_carries_cell_and_permutation_context() {
        struct FailingStatistic {
            keys: Vec<Arc<str>>,
        }
        impl CellStatistic for FailingStatistic {
            fn name(&self) -> &str {
                "failing"
            }
            fn n_times(&self) -> usize {
                1
            }
            fn n_spaces(&self) -> usize {
                1
            }
            fn keys(&self) -> &[Arc<str>] {
                &self.keys
            }
            fn evaluate(
                &self,
                _i_time: usize,
                _i_space: usize,
                _order: &[usize],
            ) -> std::result::Result<Vec<f64>, StatisticError> {
                Err(StatisticError::FitFailure {
                    message: Arc::from("singular matrix"),
                })
            }
        }

        let statistic = FailingStatistic {
            keys: vec![Arc::from("t")],
        };
        let adjacency = SpatialAdjacency::from_links(1, &[]).expect("one space");
        let design =
            DesignTable::from_rows("subject", [(0, "s0")]).expect("rows are non-empty");
        let test = PermutationTestBuilder::new(1.0)
            .build()
            .expect("configuration is valid");
        let err = test
            .run(&statistic, &adjacency, &design)
            .expect_err("statistic always fails");
        match err {
            PermutationError::Statistic {
                i_time,
                i_space,
                permutation,
                ..
            } => {
                assert_eq!((i_time, i_space), (0, 0));
                assert_eq!(permutation, None, "observed pass fails first");
            }
            other => panic!("expected a statistic failure, got {other:?}"),
        }
    }

    #[test]
    fn two_sided_p_values_shrink_with_larger_observed_stats() {
        let null = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let mut previous = 1.0;
        for observed in [0.5, 1.5, 2.5, 4.5, 6.0] {
            let p = p_value(Tail::TwoSided, observed, &null);
            assert!(p <= previous, "p must not grow with |observed|");
            previous = p;
        }
        assert_eq!(p_value(Tail::TwoSided, 6.0, &null), 0.0);
        assert_eq!(p_value(Tail::TwoSided, -6.0, &null), 0.0);
        assert_eq!(p_value(Tail::TwoSided, 0.0, &null), 1.0);
    }

    #[test]
    fn null_extremes_follow_the_tail() {
        let stats = [3.0, -7.0, 2.0];
        assert_eq!(null_extreme(Tail::Positive, &stats), 3.0);
        assert_eq!(null_extreme(Tail::Negative, &stats), -7.0);
        assert_eq!(null_extreme(Tail::TwoSided, &stats), 7.0);
        assert_eq!(null_extreme(Tail::TwoSided, &[]), 0.0);
    }
}
