//! Non-parametric spatio-temporal cluster permutation testing.
//!
//! Given a per-cell statistic over a (time × space) grid, this crate finds
//! the contiguous same-sign regions that survive a threshold and ranks each
//! region's summed statistic against an empirical null distribution built
//! by relabelling the design within groups. Contiguity combines a
//! caller-supplied spatial adjacency with ±1 adjacency in time.
//!
//! The pipeline, bottom up:
//!
//! - [`AdjacencyGraph`] — undirected adjacency-list graph scratch structure.
//! - [`ConnectedComponents`] — iterative, deterministic component labelling.
//! - [`MaskedSpatioTemporalGraph`] — projects a [`SignMask`] onto a graph of
//!   its active cells and keeps the linear ⇄ (time, space) index maps.
//! - [`cluster_level_stats`] — sums a [`StatMap`] over each [`Cluster`].
//! - [`PermutationTest`] — the observed-plus-permutations driver, built via
//!   [`PermutationTestBuilder`], evaluating any [`CellStatistic`] against a
//!   [`DesignTable`].
//!
//! Model fitting, sensor geometry and data loading stay outside the crate:
//! they arrive through the [`CellStatistic`] and [`SpatialAdjacency`]
//! boundaries.

mod adjacency;
mod builder;
mod components;
mod design;
mod error;
mod field;
mod graph;
mod permutation;
mod spatio_temporal;
mod statistic;
mod stats;

pub use crate::{
    adjacency::{AdjacencyError, AdjacencyErrorCode, SpatialAdjacency},
    builder::PermutationTestBuilder,
    components::ConnectedComponents,
    design::{DesignError, DesignErrorCode, DesignTable},
    error::{PermutationError, PermutationErrorCode, Result},
    field::{FieldError, FieldErrorCode, SignMask, StatMap, Tail},
    graph::{AdjacencyGraph, GraphError, GraphErrorCode},
    permutation::{KeyReport, PermutationTest, PermutationTestReport},
    spatio_temporal::{
        Cluster, MaskedSpatioTemporalGraph, SpatioTemporalError, SpatioTemporalErrorCode,
    },
    statistic::{CellStatistic, StatisticError, StatisticErrorCode},
    stats::cluster_level_stats,
};
