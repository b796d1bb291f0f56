//! Projection of a sign mask onto a clusterable graph.
//!
//! Active mask cells become graph vertices; edges join active cells that are
//! spatial neighbours (per the caller-supplied [`SpatialAdjacency`]) or ±1
//! temporal neighbours *and* carry the same sign. The builder also maintains
//! the bijection between linear vertex indices and (time, space)
//! coordinates, so components found on the graph can be mapped back onto a
//! statistic map.

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    adjacency::SpatialAdjacency,
    field::SignMask,
    graph::{AdjacencyGraph, GraphError},
};

/// Errors raised while building or querying a [`MaskedSpatioTemporalGraph`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum SpatioTemporalError {
    /// The mask's spatial extent must match the adjacency.
    #[error("mask covers {mask_spaces} spaces but the adjacency covers {adjacency_spaces}")]
    MaskShapeMismatch {
        /// Spatial extent of the mask.
        mask_spaces: usize,
        /// Spatial extent of the adjacency.
        adjacency_spaces: usize,
    },
    /// The mask contained no active cells, so there is no graph to build.
    #[error("mask has no active cells")]
    EmptyMask,
    /// A coordinate lookup referenced an inactive or unknown cell.
    #[error("cell ({i_time}, {i_space}) is not an active cell of the mask")]
    InactiveCell {
        /// Requested time index.
        i_time: usize,
        /// Requested space index.
        i_space: usize,
    },
    /// A linear index lookup fell outside the vertex range.
    #[error("linear index {index} is out of bounds for {vertex_count} vertices")]
    LinearOutOfBounds {
        /// The offending linear index.
        index: usize,
        /// Number of vertices in the graph.
        vertex_count: usize,
    },
    /// The underlying graph rejected an operation.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl SpatioTemporalError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> SpatioTemporalErrorCode {
        match self {
            Self::MaskShapeMismatch { .. } => SpatioTemporalErrorCode::MaskShapeMismatch,
            Self::EmptyMask => SpatioTemporalErrorCode::EmptyMask,
            Self::InactiveCell { .. } => SpatioTemporalErrorCode::InactiveCell,
            Self::LinearOutOfBounds { .. } => SpatioTemporalErrorCode::LinearOutOfBounds,
            Self::Graph(_) => SpatioTemporalErrorCode::Graph,
        }
    }
}

/// Machine-readable error codes for [`SpatioTemporalError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SpatioTemporalErrorCode {
    /// The mask's spatial extent must match the adjacency.
    MaskShapeMismatch,
    /// The mask contained no active cells.
    EmptyMask,
    /// A coordinate lookup referenced an inactive or unknown cell.
    InactiveCell,
    /// A linear index lookup fell outside the vertex range.
    LinearOutOfBounds,
    /// The underlying graph rejected an operation.
    Graph,
}

impl SpatioTemporalErrorCode {
    /// Returns the symbolic identifier for logging surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaskShapeMismatch => "SPATIO_TEMPORAL_MASK_SHAPE_MISMATCH",
            Self::EmptyMask => "SPATIO_TEMPORAL_EMPTY_MASK",
            Self::InactiveCell => "SPATIO_TEMPORAL_INACTIVE_CELL",
            Self::LinearOutOfBounds => "SPATIO_TEMPORAL_LINEAR_OUT_OF_BOUNDS",
            Self::Graph => "SPATIO_TEMPORAL_GRAPH",
        }
    }
}

/// A connected component re-expressed as parallel coordinate vectors.
///
/// `times()[k]` and `spaces()[k]` locate the k-th member cell in the source
/// grid, which is the form needed to index a statistic map directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cluster {
    times: Vec<usize>,
    spaces: Vec<usize>,
}

impl Cluster {
    /// Returns the number of member cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Returns whether the cluster has no member cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Returns the time index of every member cell.
    #[must_use]
    pub fn times(&self) -> &[usize] {
        &self.times
    }

    /// Returns the space index of every member cell.
    #[must_use]
    pub fn spaces(&self) -> &[usize] {
        &self.spaces
    }

    /// Iterates over the member cells as `(i_time, i_space)` pairs.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.times.iter().copied().zip(self.spaces.iter().copied())
    }
}

/// Graph over the active cells of a sign mask.
///
/// # Examples
/// ```
/// use permutest_core::{
///     ConnectedComponents, MaskedSpatioTemporalGraph, SignMask, SpatialAdjacency,
/// };
///
/// // Two sites in a line, three time points; the middle row is inactive.
/// let adjacency = SpatialAdjacency::from_links(2, &[(0, 1)])?;
/// let mask = SignMask::from_cells(3, 2, vec![1, 1, 0, 0, 1, 1])?;
/// let graph = MaskedSpatioTemporalGraph::build(&adjacency, &mask)?;
/// assert_eq!(graph.graph().vertex_count(), 4);
/// assert_eq!(graph.graph().edge_count(), 2);
/// let components = ConnectedComponents::new(graph.graph());
/// assert_eq!(components.component_count(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct MaskedSpatioTemporalGraph {
    graph: AdjacencyGraph,
    linear_to_matrix: Vec<(usize, usize)>,
    matrix_to_linear: HashMap<(usize, usize), usize>,
}

impl MaskedSpatioTemporalGraph {
    /// Builds the graph for one mask against one spatial adjacency.
    ///
    /// Vertices are the active cells of `mask` numbered in row-major
    /// (time-major) order. Every unordered pair of adjacent same-sign cells
    /// is visited from both endpoints; the idempotent edge insertion keeps
    /// the edge count exact regardless.
    ///
    /// # Errors
    /// Returns [`SpatioTemporalError::MaskShapeMismatch`] when the mask's
    /// spatial extent differs from the adjacency's, and
    /// [`SpatioTemporalError::EmptyMask`] when the mask has no active cells
    /// (callers treat that case as "no clusters" before building).
    pub fn build(
        adjacency: &SpatialAdjacency,
        mask: &SignMask,
    ) -> Result<Self, SpatioTemporalError> {
        if mask.n_spaces() != adjacency.space_count() {
            return Err(SpatioTemporalError::MaskShapeMismatch {
                mask_spaces: mask.n_spaces(),
                adjacency_spaces: adjacency.space_count(),
            });
        }
        let linear_to_matrix = mask.active_cells();
        if linear_to_matrix.is_empty() {
            return Err(SpatioTemporalError::EmptyMask);
        }
        let matrix_to_linear: HashMap<(usize, usize), usize> = linear_to_matrix
            .iter()
            .enumerate()
            .map(|(linear, &cell)| (cell, linear))
            .collect();

        let n_times = mask.n_times();
        let mut graph = AdjacencyGraph::new(linear_to_matrix.len())?;
        for (vertex, &(i_time, i_space)) in linear_to_matrix.iter().enumerate() {
            let sign = mask.sign_unchecked(i_time, i_space);
            for &neighbour_space in adjacency.neighbours(i_space) {
                if mask.sign_unchecked(i_time, neighbour_space) != sign {
                    continue;
                }
                if let Some(&neighbour) = matrix_to_linear.get(&(i_time, neighbour_space)) {
                    graph.add_edge(vertex, neighbour)?;
                }
            }
            if i_time > 0 && mask.sign_unchecked(i_time - 1, i_space) == sign {
                if let Some(&neighbour) = matrix_to_linear.get(&(i_time - 1, i_space)) {
                    graph.add_edge(vertex, neighbour)?;
                }
            }
            if i_time + 1 < n_times && mask.sign_unchecked(i_time + 1, i_space) == sign {
                if let Some(&neighbour) = matrix_to_linear.get(&(i_time + 1, i_space)) {
                    graph.add_edge(vertex, neighbour)?;
                }
            }
        }

        Ok(Self {
            graph,
            linear_to_matrix,
            matrix_to_linear,
        })
    }

    /// Returns the underlying graph for component labelling.
    #[must_use]
    pub fn graph(&self) -> &AdjacencyGraph {
        &self.graph
    }

    /// Converts a linear vertex index to its (time, space) coordinate.
    ///
    /// # Errors
    /// Returns [`SpatioTemporalError::LinearOutOfBounds`] when `index` is
    /// not a vertex of this graph.
    pub fn linear_to_matrix(&self, index: usize) -> Result<(usize, usize), SpatioTemporalError> {
        self.linear_to_matrix.get(index).copied().ok_or(
            SpatioTemporalError::LinearOutOfBounds {
                index,
                vertex_count: self.linear_to_matrix.len(),
            },
        )
    }

    /// Converts a (time, space) coordinate to its linear vertex index.
    ///
    /// # Errors
    /// Returns [`SpatioTemporalError::InactiveCell`] when the coordinate is
    /// not an active cell of the mask.
    pub fn matrix_to_linear(
        &self,
        i_time: usize,
        i_space: usize,
    ) -> Result<usize, SpatioTemporalError> {
        self.matrix_to_linear
            .get(&(i_time, i_space))
            .copied()
            .ok_or(SpatioTemporalError::InactiveCell { i_time, i_space })
    }

    /// Re-expresses linear-index components as coordinate clusters.
    ///
    /// Cluster order follows the component order; member order follows the
    /// member order within each component.
    ///
    /// # Errors
    /// Returns [`SpatioTemporalError::LinearOutOfBounds`] when a component
    /// references a vertex this graph does not contain.
    pub fn components_to_matrix(
        &self,
        components: &[Vec<usize>],
    ) -> Result<Vec<Cluster>, SpatioTemporalError> {
        components
            .iter()
            .map(|component| {
                let mut times = Vec::with_capacity(component.len());
                let mut spaces = Vec::with_capacity(component.len());
                for &vertex in component {
                    let (i_time, i_space) = self.linear_to_matrix(vertex)?;
                    times.push(i_time);
                    spaces.push(i_space);
                }
                Ok(Cluster { times, spaces })
            })
            .collect()
    }
}
