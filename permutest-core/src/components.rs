//! Connected-component labelling over [`AdjacencyGraph`].
//!
//! Labelling uses an iterative depth-first traversal with an explicit stack.
//! Recursion is avoided on purpose: the masked spatio-temporal graphs this
//! runs over can reach a million vertices arranged in long chains, where a
//! recursive walk would exhaust the call stack.

use crate::graph::{AdjacencyGraph, GraphError};

const UNVISITED: usize = usize::MAX;

/// Partition of a graph's vertices into connected components.
///
/// Component ids follow first-discovery order of the vertex scan `0..V`, so
/// the same graph always yields the same labelling.
///
/// # Examples
/// ```
/// use permutest_core::{AdjacencyGraph, ConnectedComponents};
///
/// let mut graph = AdjacencyGraph::new(4)?;
/// graph.add_edge(0, 1)?;
/// graph.add_edge(2, 3)?;
/// let components = ConnectedComponents::new(&graph);
/// assert_eq!(components.component_count(), 2);
/// assert_eq!(components.component_of(3)?, 1);
/// assert_eq!(components.components(), vec![vec![0, 1], vec![2, 3]]);
/// # Ok::<(), permutest_core::GraphError>(())
/// ```
#[derive(Clone, Debug)]
pub struct ConnectedComponents {
    ids: Vec<usize>,
    count: usize,
}

impl ConnectedComponents {
    /// Labels every vertex of `graph` with its component id in O(V + E).
    #[must_use]
    pub fn new(graph: &AdjacencyGraph) -> Self {
        let vertex_count = graph.vertex_count();
        let mut ids = vec![UNVISITED; vertex_count];
        let mut count = 0;
        let mut stack = Vec::new();
        for start in 0..vertex_count {
            if ids[start] != UNVISITED {
                continue;
            }
            ids[start] = count;
            stack.push(start);
            while let Some(v) = stack.pop() {
                for &w in graph.neighbours_unchecked(v) {
                    if ids[w] == UNVISITED {
                        ids[w] = count;
                        stack.push(w);
                    }
                }
            }
            count += 1;
        }
        Self { ids, count }
    }

    /// Returns the number of connected components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.count
    }

    /// Returns the component id of vertex `v`, in `0..component_count()`.
    ///
    /// # Errors
    /// Returns [`GraphError::VertexOutOfBounds`] when `v` was not a vertex of
    /// the labelled graph.
    pub fn component_of(&self, v: usize) -> Result<usize, GraphError> {
        self.ids
            .get(v)
            .copied()
            .ok_or(GraphError::VertexOutOfBounds {
                vertex: v,
                vertex_count: self.ids.len(),
            })
    }

    /// Returns the member vertices of every component.
    ///
    /// Members are listed in ascending vertex order; components are ordered
    /// by the first vertex discovered in each.
    #[must_use]
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.count];
        for (v, &id) in self.ids.iter().enumerate() {
            members[id].push(v);
        }
        members
    }
}
