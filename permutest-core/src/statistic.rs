//! The pluggable per-cell statistic capability.
//!
//! The permutation driver never fits a model itself. Any statistic — a
//! mixed-effects regression, a mean difference, a custom score — plugs in
//! through [`CellStatistic`]: given one (time, space) cell and a row order
//! over the design table, produce one scalar per tracked key. Implementations
//! own their data and design; the driver only ever varies the row order.

use std::sync::Arc;

use thiserror::Error;

/// Errors raised by a [`CellStatistic`] implementation.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum StatisticError {
    /// The requested cell is outside the statistic's grid.
    #[error("cell ({i_time}, {i_space}) is out of bounds for shape ({n_times}, {n_spaces})")]
    CellOutOfBounds {
        /// Requested time index.
        i_time: usize,
        /// Requested space index.
        i_space: usize,
        /// Number of time points covered by the statistic.
        n_times: usize,
        /// Number of spatial sites covered by the statistic.
        n_spaces: usize,
    },
    /// The supplied row order did not cover the design rows.
    #[error("row order has {got} entries but the design has {expected} rows")]
    OrderLengthMismatch {
        /// Number of order entries supplied.
        got: usize,
        /// Number of design rows expected.
        expected: usize,
    },
    /// The statistic computation itself failed for this cell.
    #[error("statistic fit failed: {message}")]
    FitFailure {
        /// Human-readable description of the underlying failure.
        message: Arc<str>,
    },
}

impl StatisticError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> StatisticErrorCode {
        match self {
            Self::CellOutOfBounds { .. } => StatisticErrorCode::CellOutOfBounds,
            Self::OrderLengthMismatch { .. } => StatisticErrorCode::OrderLengthMismatch,
            Self::FitFailure { .. } => StatisticErrorCode::FitFailure,
        }
    }
}

/// Machine-readable error codes for [`StatisticError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StatisticErrorCode {
    /// The requested cell is outside the statistic's grid.
    CellOutOfBounds,
    /// The supplied row order did not cover the design rows.
    OrderLengthMismatch,
    /// The statistic computation itself failed for this cell.
    FitFailure,
}

impl StatisticErrorCode {
    /// Returns the symbolic identifier for logging surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CellOutOfBounds => "STATISTIC_CELL_OUT_OF_BOUNDS",
            Self::OrderLengthMismatch => "STATISTIC_ORDER_LENGTH_MISMATCH",
            Self::FitFailure => "STATISTIC_FIT_FAILURE",
        }
    }
}

/// Per-cell statistic over a (time × space) grid, evaluated under a row
/// relabelling.
///
/// `order[k]` names the design row whose labels stand in for row `k` during
/// this evaluation. The identity order reproduces the observed labelling;
/// a within-group shuffle produces one permutation. Implementations must be
/// pure per call and safe to invoke concurrently — the driver fans cells
/// out across a thread pool.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use permutest_core::{CellStatistic, StatisticError};
///
/// /// Difference between labelled halves of a single measurement vector.
/// struct MeanShift {
///     keys: Vec<Arc<str>>,
///     data: Vec<f64>, // one value per design row, same at every cell
/// }
///
/// impl CellStatistic for MeanShift {
///     fn name(&self) -> &str { "mean-shift" }
///     fn n_times(&self) -> usize { 1 }
///     fn n_spaces(&self) -> usize { 1 }
///     fn keys(&self) -> &[Arc<str>] { &self.keys }
///     fn evaluate(
///         &self,
///         _i_time: usize,
///         _i_space: usize,
///         order: &[usize],
///     ) -> Result<Vec<f64>, StatisticError> {
///         let half = order.len() / 2;
///         let first: f64 = order[..half].iter().map(|&row| self.data[row]).sum();
///         let second: f64 = order[half..].iter().map(|&row| self.data[row]).sum();
///         Ok(vec![first - second])
///     }
/// }
///
/// let statistic = MeanShift {
///     keys: vec![Arc::from("shift")],
///     data: vec![1.0, 2.0, 3.0, 4.0],
/// };
/// let observed = statistic.evaluate(0, 0, &[0, 1, 2, 3])?;
/// assert_eq!(observed, vec![-4.0]);
/// # Ok::<(), StatisticError>(())
/// ```
pub trait CellStatistic: Sync {
    /// Returns a human-readable name used in errors and tracing spans.
    fn name(&self) -> &str;

    /// Returns the number of time points in the statistic's grid.
    fn n_times(&self) -> usize;

    /// Returns the number of spatial sites in the statistic's grid.
    fn n_spaces(&self) -> usize;

    /// Returns the tracked statistic keys, one output scalar per key.
    fn keys(&self) -> &[Arc<str>];

    /// Evaluates the statistic at one cell under the given row order.
    ///
    /// Must return exactly `keys().len()` values, in `keys()` order.
    ///
    /// # Errors
    /// Returns a [`StatisticError`] when the cell is out of range, the order
    /// does not cover the design, or the underlying computation fails.
    fn evaluate(
        &self,
        i_time: usize,
        i_space: usize,
        order: &[usize],
    ) -> Result<Vec<f64>, StatisticError>;
}
