//! Driver-level error types and the crate result alias.
//!
//! The graph, grid and design layers carry their own error enums; this
//! module defines the error surface of the permutation driver, which wraps
//! those layers and adds the configuration and collaborator failures only
//! the driver can detect.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    field::FieldError, graph::GraphError, spatio_temporal::SpatioTemporalError,
    statistic::StatisticError,
};

/// Error type produced when configuring or running a permutation test.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PermutationError {
    /// The clustering threshold must be a finite number.
    #[error("clustering threshold must be finite (got {got})")]
    InvalidThreshold {
        /// The invalid threshold supplied by the caller.
        got: f64,
    },
    /// At least one permutation is required.
    #[error("permutation count must be at least 1 (got {got})")]
    InvalidPermutationCount {
        /// The invalid permutation count supplied by the caller.
        got: usize,
    },
    /// An explicit key selection must name at least one key.
    #[error("key selection must name at least one statistic key")]
    EmptyKeySelection,
    /// The statistic exposes no keys to track.
    #[error("statistic `{statistic}` exposes no keys")]
    NoTrackedKeys {
        /// Name of the statistic.
        statistic: Arc<str>,
    },
    /// A selected key is not exposed by the statistic.
    #[error("statistic `{statistic}` does not expose key `{key}`")]
    UnknownKey {
        /// The unmatched key.
        key: Arc<str>,
        /// Name of the statistic.
        statistic: Arc<str>,
    },
    /// The statistic's spatial extent must match the adjacency.
    #[error(
        "statistic `{statistic}` covers {statistic_spaces} spaces but the adjacency covers {adjacency_spaces}"
    )]
    SpaceCountMismatch {
        /// Name of the statistic.
        statistic: Arc<str>,
        /// Spatial extent of the statistic's grid.
        statistic_spaces: usize,
        /// Spatial extent of the adjacency.
        adjacency_spaces: usize,
    },
    /// A statistic evaluation returned the wrong number of values.
    #[error("statistic `{statistic}` returned {got} values but exposes {expected} keys")]
    KeyCountMismatch {
        /// Name of the statistic.
        statistic: Arc<str>,
        /// Number of values returned.
        got: usize,
        /// Number of keys exposed.
        expected: usize,
    },
    /// A statistic evaluation failed; the whole map is abandoned.
    #[error(
        "statistic `{statistic}` failed at cell ({i_time}, {i_space}) during {}: {error}",
        .permutation.map_or_else(|| "the observed pass".to_owned(), |index| format!("permutation {index}"))
    )]
    Statistic {
        /// Name of the statistic.
        statistic: Arc<str>,
        /// Time index of the failing cell.
        i_time: usize,
        /// Space index of the failing cell.
        i_space: usize,
        /// Index of the failing permutation; `None` for the observed pass.
        permutation: Option<usize>,
        /// Underlying statistic error.
        #[source]
        error: StatisticError,
    },
    /// A grid operation failed inside the pipeline.
    #[error(transparent)]
    Field(#[from] FieldError),
    /// Building or querying the masked graph failed.
    #[error(transparent)]
    SpatioTemporal(#[from] SpatioTemporalError),
    /// A graph operation failed inside the pipeline.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl PermutationError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> PermutationErrorCode {
        match self {
            Self::InvalidThreshold { .. } => PermutationErrorCode::InvalidThreshold,
            Self::InvalidPermutationCount { .. } => PermutationErrorCode::InvalidPermutationCount,
            Self::EmptyKeySelection => PermutationErrorCode::EmptyKeySelection,
            Self::NoTrackedKeys { .. } => PermutationErrorCode::NoTrackedKeys,
            Self::UnknownKey { .. } => PermutationErrorCode::UnknownKey,
            Self::SpaceCountMismatch { .. } => PermutationErrorCode::SpaceCountMismatch,
            Self::KeyCountMismatch { .. } => PermutationErrorCode::KeyCountMismatch,
            Self::Statistic { .. } => PermutationErrorCode::Statistic,
            Self::Field(_) => PermutationErrorCode::Field,
            Self::SpatioTemporal(_) => PermutationErrorCode::SpatioTemporal,
            Self::Graph(_) => PermutationErrorCode::Graph,
        }
    }
}

/// Machine-readable error codes for [`PermutationError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PermutationErrorCode {
    /// The clustering threshold must be a finite number.
    InvalidThreshold,
    /// At least one permutation is required.
    InvalidPermutationCount,
    /// An explicit key selection must name at least one key.
    EmptyKeySelection,
    /// The statistic exposes no keys to track.
    NoTrackedKeys,
    /// A selected key is not exposed by the statistic.
    UnknownKey,
    /// The statistic's spatial extent must match the adjacency.
    SpaceCountMismatch,
    /// A statistic evaluation returned the wrong number of values.
    KeyCountMismatch,
    /// A statistic evaluation failed.
    Statistic,
    /// A grid operation failed inside the pipeline.
    Field,
    /// Building or querying the masked graph failed.
    SpatioTemporal,
    /// A graph operation failed inside the pipeline.
    Graph,
}

impl PermutationErrorCode {
    /// Returns the symbolic identifier for logging surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidThreshold => "PERMUTATION_INVALID_THRESHOLD",
            Self::InvalidPermutationCount => "PERMUTATION_INVALID_PERMUTATION_COUNT",
            Self::EmptyKeySelection => "PERMUTATION_EMPTY_KEY_SELECTION",
            Self::NoTrackedKeys => "PERMUTATION_NO_TRACKED_KEYS",
            Self::UnknownKey => "PERMUTATION_UNKNOWN_KEY",
            Self::SpaceCountMismatch => "PERMUTATION_SPACE_COUNT_MISMATCH",
            Self::KeyCountMismatch => "PERMUTATION_KEY_COUNT_MISMATCH",
            Self::Statistic => "PERMUTATION_STATISTIC_FAILURE",
            Self::Field => "PERMUTATION_FIELD_FAILURE",
            Self::SpatioTemporal => "PERMUTATION_SPATIO_TEMPORAL_FAILURE",
            Self::Graph => "PERMUTATION_GRAPH_FAILURE",
        }
    }
}

/// Convenient alias for results returned by the driver API.
pub type Result<T> = core::result::Result<T, PermutationError>;
