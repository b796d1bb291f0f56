//! Sparse spatial adjacency supplied by the caller.
//!
//! Sensor geometry lives outside this crate; what arrives here is the
//! symmetric boolean relation "these two spatial sites are neighbours",
//! stored as per-site neighbour lists rather than a dense matrix.

use thiserror::Error;

/// Errors raised while constructing a [`SpatialAdjacency`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum AdjacencyError {
    /// The adjacency must cover at least one spatial site.
    #[error("space count must be positive (got {got})")]
    InvalidSpaceCount {
        /// The invalid site count supplied by the caller.
        got: usize,
    },
    /// A link referenced a site outside the declared range.
    #[error("link endpoint {space} is out of bounds for {space_count} spaces")]
    LinkOutOfBounds {
        /// The offending site index.
        space: usize,
        /// The declared number of spatial sites.
        space_count: usize,
    },
    /// A site cannot neighbour itself.
    #[error("space {space} links to itself")]
    SelfLink {
        /// The self-linking site index.
        space: usize,
    },
    /// The dense matrix length did not match the declared site count.
    #[error("dense adjacency has {got} entries but {expected} were expected")]
    DenseLengthMismatch {
        /// Number of entries supplied.
        got: usize,
        /// `space_count * space_count`.
        expected: usize,
    },
    /// The dense matrix was not symmetric.
    #[error("dense adjacency is asymmetric at ({row}, {col})")]
    Asymmetric {
        /// Row of the asymmetric entry.
        row: usize,
        /// Column of the asymmetric entry.
        col: usize,
    },
}

impl AdjacencyError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> AdjacencyErrorCode {
        match self {
            Self::InvalidSpaceCount { .. } => AdjacencyErrorCode::InvalidSpaceCount,
            Self::LinkOutOfBounds { .. } => AdjacencyErrorCode::LinkOutOfBounds,
            Self::SelfLink { .. } => AdjacencyErrorCode::SelfLink,
            Self::DenseLengthMismatch { .. } => AdjacencyErrorCode::DenseLengthMismatch,
            Self::Asymmetric { .. } => AdjacencyErrorCode::Asymmetric,
        }
    }
}

/// Machine-readable error codes for [`AdjacencyError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AdjacencyErrorCode {
    /// The adjacency must cover at least one spatial site.
    InvalidSpaceCount,
    /// A link referenced a site outside the declared range.
    LinkOutOfBounds,
    /// A site cannot neighbour itself.
    SelfLink,
    /// The dense matrix length did not match the declared site count.
    DenseLengthMismatch,
    /// The dense matrix was not symmetric.
    Asymmetric,
}

impl AdjacencyErrorCode {
    /// Returns the symbolic identifier for logging surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidSpaceCount => "ADJACENCY_INVALID_SPACE_COUNT",
            Self::LinkOutOfBounds => "ADJACENCY_LINK_OUT_OF_BOUNDS",
            Self::SelfLink => "ADJACENCY_SELF_LINK",
            Self::DenseLengthMismatch => "ADJACENCY_DENSE_LENGTH_MISMATCH",
            Self::Asymmetric => "ADJACENCY_ASYMMETRIC",
        }
    }
}

/// Symmetric neighbour relation over `space_count` spatial sites.
///
/// # Examples
/// ```
/// use permutest_core::SpatialAdjacency;
///
/// // A ring of four sites.
/// let ring = SpatialAdjacency::from_links(4, &[(0, 1), (1, 2), (2, 3), (3, 0)])?;
/// assert_eq!(ring.space_count(), 4);
/// assert_eq!(ring.neighbours(0), &[1, 3]);
/// # Ok::<(), permutest_core::AdjacencyError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpatialAdjacency {
    neighbours: Vec<Vec<usize>>,
}

impl SpatialAdjacency {
    /// Builds the relation from undirected links between sites.
    ///
    /// Each link is recorded in both directions; repeated links collapse to
    /// one. Neighbour lists come out sorted ascending.
    ///
    /// # Errors
    /// Returns [`AdjacencyError::InvalidSpaceCount`] for zero sites,
    /// [`AdjacencyError::LinkOutOfBounds`] for endpoints beyond
    /// `space_count`, and [`AdjacencyError::SelfLink`] for degenerate links.
    pub fn from_links(
        space_count: usize,
        links: &[(usize, usize)],
    ) -> Result<Self, AdjacencyError> {
        if space_count == 0 {
            return Err(AdjacencyError::InvalidSpaceCount { got: space_count });
        }
        let mut neighbours = vec![Vec::new(); space_count];
        for &(a, b) in links {
            for space in [a, b] {
                if space >= space_count {
                    return Err(AdjacencyError::LinkOutOfBounds { space, space_count });
                }
            }
            if a == b {
                return Err(AdjacencyError::SelfLink { space: a });
            }
            neighbours[a].push(b);
            neighbours[b].push(a);
        }
        for list in &mut neighbours {
            list.sort_unstable();
            list.dedup();
        }
        Ok(Self { neighbours })
    }

    /// Builds the relation from a dense row-major boolean matrix.
    ///
    /// Diagonal entries are ignored; off-diagonal entries must be symmetric.
    ///
    /// # Errors
    /// Returns [`AdjacencyError::DenseLengthMismatch`] when `matrix` is not
    /// `space_count * space_count` long and [`AdjacencyError::Asymmetric`]
    /// when `matrix[r][c] != matrix[c][r]`.
    pub fn from_dense(space_count: usize, matrix: &[bool]) -> Result<Self, AdjacencyError> {
        if space_count == 0 {
            return Err(AdjacencyError::InvalidSpaceCount { got: space_count });
        }
        let expected = space_count * space_count;
        if matrix.len() != expected {
            return Err(AdjacencyError::DenseLengthMismatch {
                got: matrix.len(),
                expected,
            });
        }
        let mut links = Vec::new();
        for row in 0..space_count {
            for col in row + 1..space_count {
                let forward = matrix[row * space_count + col];
                if forward != matrix[col * space_count + row] {
                    return Err(AdjacencyError::Asymmetric { row, col });
                }
                if forward {
                    links.push((row, col));
                }
            }
        }
        Self::from_links(space_count, &links)
    }

    /// Returns the number of spatial sites covered by the relation.
    #[must_use]
    pub fn space_count(&self) -> usize {
        self.neighbours.len()
    }

    /// Returns the neighbours of `space` in ascending order.
    ///
    /// # Panics
    /// Panics when `space >= space_count()`; the graph builder validates the
    /// mask shape against the adjacency before querying.
    #[must_use]
    pub fn neighbours(&self, space: usize) -> &[usize] {
        &self.neighbours[space]
    }
}
