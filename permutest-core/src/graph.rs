//! Undirected adjacency-list graph used as the clustering substrate.
//!
//! The graph is deliberately minimal: a fixed vertex set, incremental edge
//! insertion, and neighbour queries. It is a short-lived scratch structure —
//! one instance per statistic-map evaluation — so there is no removal
//! support and no interior mutability.

use std::fmt;

use thiserror::Error;

/// Errors raised by [`AdjacencyGraph`] construction and queries.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum GraphError {
    /// A graph must contain at least one vertex.
    #[error("vertex count must be positive (got {got})")]
    InvalidVertexCount {
        /// The invalid vertex count supplied by the caller.
        got: usize,
    },
    /// An edge endpoint or lookup referenced a vertex outside the graph.
    #[error("vertex {vertex} is out of bounds for a graph with {vertex_count} vertices")]
    VertexOutOfBounds {
        /// The offending vertex index.
        vertex: usize,
        /// The number of vertices in the graph.
        vertex_count: usize,
    },
}

impl GraphError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> GraphErrorCode {
        match self {
            Self::InvalidVertexCount { .. } => GraphErrorCode::InvalidVertexCount,
            Self::VertexOutOfBounds { .. } => GraphErrorCode::VertexOutOfBounds,
        }
    }
}

/// Machine-readable error codes for [`GraphError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum GraphErrorCode {
    /// A graph must contain at least one vertex.
    InvalidVertexCount,
    /// An edge endpoint or lookup referenced a vertex outside the graph.
    VertexOutOfBounds,
}

impl GraphErrorCode {
    /// Returns the symbolic identifier for logging surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidVertexCount => "INVALID_VERTEX_COUNT",
            Self::VertexOutOfBounds => "VERTEX_OUT_OF_BOUNDS",
        }
    }
}

impl fmt::Display for GraphErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Undirected, unweighted, simple graph over a fixed vertex set.
///
/// Edges are stored as per-vertex neighbour lists sized to the actual edge
/// count, not the dense pairwise matrix. Duplicate insertions of the same
/// unordered pair are absorbed without touching the edge count, so the
/// spatio-temporal builder may visit a pair from both endpoints.
///
/// # Examples
/// ```
/// use permutest_core::AdjacencyGraph;
///
/// let mut graph = AdjacencyGraph::new(3)?;
/// graph.add_edge(0, 1)?;
/// graph.add_edge(1, 0)?; // no-op
/// assert_eq!(graph.vertex_count(), 3);
/// assert_eq!(graph.edge_count(), 1);
/// assert_eq!(graph.neighbours(1)?, &[0]);
/// # Ok::<(), permutest_core::GraphError>(())
/// ```
#[derive(Clone, Debug)]
pub struct AdjacencyGraph {
    adjacency: Vec<Vec<usize>>,
    edge_count: usize,
}

impl AdjacencyGraph {
    /// Creates a graph with `vertex_count` vertices and no edges.
    ///
    /// # Errors
    /// Returns [`GraphError::InvalidVertexCount`] when `vertex_count` is zero.
    pub fn new(vertex_count: usize) -> Result<Self, GraphError> {
        if vertex_count == 0 {
            return Err(GraphError::InvalidVertexCount { got: vertex_count });
        }
        Ok(Self {
            adjacency: vec![Vec::new(); vertex_count],
            edge_count: 0,
        })
    }

    /// Returns the number of vertices fixed at construction.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Returns the number of distinct undirected edges inserted so far.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Records the undirected edge `{v, w}`.
    ///
    /// Inserting a pair that is already present leaves the graph unchanged;
    /// the edge count never double-counts a pair visited from both sides.
    ///
    /// # Errors
    /// Returns [`GraphError::VertexOutOfBounds`] when either endpoint is not
    /// a vertex of this graph.
    pub fn add_edge(&mut self, v: usize, w: usize) -> Result<(), GraphError> {
        self.check_vertex(v)?;
        self.check_vertex(w)?;
        if self.adjacency[v].contains(&w) {
            return Ok(());
        }
        self.adjacency[v].push(w);
        if v != w {
            self.adjacency[w].push(v);
        }
        self.edge_count += 1;
        Ok(())
    }

    /// Returns the neighbours of `v` in insertion order.
    ///
    /// The order is deterministic for a fixed construction sequence, which
    /// keeps downstream component labelling reproducible.
    ///
    /// # Errors
    /// Returns [`GraphError::VertexOutOfBounds`] when `v` is not a vertex of
    /// this graph.
    pub fn neighbours(&self, v: usize) -> Result<&[usize], GraphError> {
        self.check_vertex(v)?;
        Ok(&self.adjacency[v])
    }

    /// Neighbour access for callers that have already validated `v`.
    pub(crate) fn neighbours_unchecked(&self, v: usize) -> &[usize] {
        &self.adjacency[v]
    }

    fn check_vertex(&self, v: usize) -> Result<(), GraphError> {
        if v >= self.adjacency.len() {
            return Err(GraphError::VertexOutOfBounds {
                vertex: v,
                vertex_count: self.adjacency.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for AdjacencyGraph {
    /// Lists each undirected edge once as `v <--> w` with `v <= w`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (v, neighbours) in self.adjacency.iter().enumerate() {
            for &w in neighbours.iter().filter(|&&w| v <= w) {
                if !first {
                    writeln!(f)?;
                }
                write!(f, "{v} <--> {w}")?;
                first = false;
            }
        }
        Ok(())
    }
}
