//! Dense (time × space) grids: per-cell statistic maps and sign masks.
//!
//! A [`StatMap`] holds one scalar per (time, space) cell in row-major
//! (time-major) order. Thresholding a map produces a [`SignMask`] whose
//! entries are −1, 0 or +1; the sign separates above-threshold from
//! below-negative-threshold regions so the clustering stage never merges
//! opposite-sign cells.

use thiserror::Error;

/// Which direction of extremity counts as significant.
///
/// Mirrors the conventional `+1 / -1 / 0` encoding via [`Tail::from_i8`].
///
/// # Examples
/// ```
/// use permutest_core::Tail;
///
/// assert_eq!(Tail::from_i8(0), Some(Tail::TwoSided));
/// assert_eq!(Tail::Positive.as_i8(), 1);
/// assert_eq!(Tail::from_i8(3), None);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Tail {
    /// Only values above the threshold are of interest.
    Positive,
    /// Only values below the threshold are of interest.
    Negative,
    /// Both directions, compared by absolute value.
    TwoSided,
}

impl Tail {
    /// Decodes the conventional integer encoding: `+1`, `-1` or `0`.
    #[must_use]
    pub const fn from_i8(value: i8) -> Option<Self> {
        match value {
            1 => Some(Self::Positive),
            -1 => Some(Self::Negative),
            0 => Some(Self::TwoSided),
            _ => None,
        }
    }

    /// Returns the conventional integer encoding of this tail.
    #[must_use]
    pub const fn as_i8(self) -> i8 {
        match self {
            Self::Positive => 1,
            Self::Negative => -1,
            Self::TwoSided => 0,
        }
    }
}

/// Errors raised by grid construction and cell access.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum FieldError {
    /// Both grid dimensions must be positive.
    #[error("grid shape ({n_times}, {n_spaces}) must have positive dimensions")]
    InvalidShape {
        /// Number of time points requested.
        n_times: usize,
        /// Number of spatial sites requested.
        n_spaces: usize,
    },
    /// The backing buffer did not match the declared shape.
    #[error("grid has {got} values but shape ({n_times}, {n_spaces}) needs {expected}")]
    ValueLengthMismatch {
        /// Number of values supplied.
        got: usize,
        /// `n_times * n_spaces`.
        expected: usize,
        /// Number of time points declared.
        n_times: usize,
        /// Number of spatial sites declared.
        n_spaces: usize,
    },
    /// A cell lookup fell outside the grid.
    #[error("cell ({i_time}, {i_space}) is out of bounds for shape ({n_times}, {n_spaces})")]
    CellOutOfBounds {
        /// Requested time index.
        i_time: usize,
        /// Requested space index.
        i_space: usize,
        /// Number of time points in the grid.
        n_times: usize,
        /// Number of spatial sites in the grid.
        n_spaces: usize,
    },
}

impl FieldError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> FieldErrorCode {
        match self {
            Self::InvalidShape { .. } => FieldErrorCode::InvalidShape,
            Self::ValueLengthMismatch { .. } => FieldErrorCode::ValueLengthMismatch,
            Self::CellOutOfBounds { .. } => FieldErrorCode::CellOutOfBounds,
        }
    }
}

/// Machine-readable error codes for [`FieldError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FieldErrorCode {
    /// Both grid dimensions must be positive.
    InvalidShape,
    /// The backing buffer did not match the declared shape.
    ValueLengthMismatch,
    /// A cell lookup fell outside the grid.
    CellOutOfBounds,
}

impl FieldErrorCode {
    /// Returns the symbolic identifier for logging surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidShape => "FIELD_INVALID_SHAPE",
            Self::ValueLengthMismatch => "FIELD_VALUE_LENGTH_MISMATCH",
            Self::CellOutOfBounds => "FIELD_CELL_OUT_OF_BOUNDS",
        }
    }
}

/// Per-cell statistic values over a (time × space) grid.
///
/// # Examples
/// ```
/// use permutest_core::StatMap;
///
/// let mut map = StatMap::zeros(2, 3)?;
/// map.set(1, 2, 4.5)?;
/// assert_eq!(map.get(1, 2)?, 4.5);
/// assert_eq!(map.get(0, 0)?, 0.0);
/// # Ok::<(), permutest_core::FieldError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct StatMap {
    n_times: usize,
    n_spaces: usize,
    values: Vec<f64>,
}

impl StatMap {
    /// Creates an all-zero map of the given shape.
    ///
    /// # Errors
    /// Returns [`FieldError::InvalidShape`] when either dimension is zero.
    pub fn zeros(n_times: usize, n_spaces: usize) -> Result<Self, FieldError> {
        check_shape(n_times, n_spaces)?;
        Ok(Self {
            n_times,
            n_spaces,
            values: vec![0.0; n_times * n_spaces],
        })
    }

    /// Wraps an existing row-major (time-major) buffer.
    ///
    /// # Errors
    /// Returns [`FieldError::InvalidShape`] for a zero dimension and
    /// [`FieldError::ValueLengthMismatch`] when the buffer length is not
    /// `n_times * n_spaces`.
    pub fn from_values(
        n_times: usize,
        n_spaces: usize,
        values: Vec<f64>,
    ) -> Result<Self, FieldError> {
        check_shape(n_times, n_spaces)?;
        let expected = n_times * n_spaces;
        if values.len() != expected {
            return Err(FieldError::ValueLengthMismatch {
                got: values.len(),
                expected,
                n_times,
                n_spaces,
            });
        }
        Ok(Self {
            n_times,
            n_spaces,
            values,
        })
    }

    /// Returns the number of time points.
    #[must_use]
    pub fn n_times(&self) -> usize {
        self.n_times
    }

    /// Returns the number of spatial sites.
    #[must_use]
    pub fn n_spaces(&self) -> usize {
        self.n_spaces
    }

    /// Returns the backing row-major buffer.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns the value at cell `(i_time, i_space)`.
    ///
    /// # Errors
    /// Returns [`FieldError::CellOutOfBounds`] when the cell is outside the
    /// grid.
    pub fn get(&self, i_time: usize, i_space: usize) -> Result<f64, FieldError> {
        self.check_cell(i_time, i_space)?;
        Ok(self.values[i_time * self.n_spaces + i_space])
    }

    /// Overwrites the value at cell `(i_time, i_space)`.
    ///
    /// # Errors
    /// Returns [`FieldError::CellOutOfBounds`] when the cell is outside the
    /// grid.
    pub fn set(&mut self, i_time: usize, i_space: usize, value: f64) -> Result<(), FieldError> {
        self.check_cell(i_time, i_space)?;
        self.values[i_time * self.n_spaces + i_space] = value;
        Ok(())
    }

    /// Cell access for callers that have already validated the coordinate.
    pub(crate) fn value_unchecked(&self, i_time: usize, i_space: usize) -> f64 {
        self.values[i_time * self.n_spaces + i_space]
    }

    /// Thresholds the map into a sign mask.
    ///
    /// Comparisons are strict: a value exactly equal to the threshold stays
    /// inactive. [`Tail::Positive`] marks `value > thresh` with +1,
    /// [`Tail::Negative`] marks `value < thresh` with −1, and
    /// [`Tail::TwoSided`] marks `value > thresh` with +1 and
    /// `value < -thresh` with −1.
    ///
    /// # Examples
    /// ```
    /// use permutest_core::{StatMap, Tail};
    ///
    /// let map = StatMap::from_values(1, 4, vec![2.5, -3.0, 1.0, 2.0])?;
    /// let mask = map.threshold(2.0, Tail::TwoSided);
    /// assert_eq!(mask.sign(0, 0)?, 1);
    /// assert_eq!(mask.sign(0, 1)?, -1);
    /// assert_eq!(mask.sign(0, 2)?, 0);
    /// assert_eq!(mask.sign(0, 3)?, 0); // exactly at threshold
    /// # Ok::<(), permutest_core::FieldError>(())
    /// ```
    #[must_use]
    pub fn threshold(&self, thresh: f64, tail: Tail) -> SignMask {
        let cells = self
            .values
            .iter()
            .map(|&value| match tail {
                Tail::Positive => i8::from(value > thresh),
                Tail::Negative => -i8::from(value < thresh),
                Tail::TwoSided => {
                    if value > thresh {
                        1
                    } else if value < -thresh {
                        -1
                    } else {
                        0
                    }
                }
            })
            .collect();
        SignMask {
            n_times: self.n_times,
            n_spaces: self.n_spaces,
            cells,
        }
    }

    fn check_cell(&self, i_time: usize, i_space: usize) -> Result<(), FieldError> {
        if i_time >= self.n_times || i_space >= self.n_spaces {
            return Err(FieldError::CellOutOfBounds {
                i_time,
                i_space,
                n_times: self.n_times,
                n_spaces: self.n_spaces,
            });
        }
        Ok(())
    }
}

/// Signed activity mask over a (time × space) grid, entries in {−1, 0, +1}.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignMask {
    n_times: usize,
    n_spaces: usize,
    cells: Vec<i8>,
}

impl SignMask {
    /// Wraps an explicit mask buffer; useful for tests and pre-masked input.
    ///
    /// # Errors
    /// Returns [`FieldError::InvalidShape`] for a zero dimension and
    /// [`FieldError::ValueLengthMismatch`] when the buffer length is not
    /// `n_times * n_spaces`. Entries are clamped to their sign, so any
    /// non-zero value marks an active cell.
    pub fn from_cells(
        n_times: usize,
        n_spaces: usize,
        cells: Vec<i8>,
    ) -> Result<Self, FieldError> {
        check_shape(n_times, n_spaces)?;
        let expected = n_times * n_spaces;
        if cells.len() != expected {
            return Err(FieldError::ValueLengthMismatch {
                got: cells.len(),
                expected,
                n_times,
                n_spaces,
            });
        }
        let cells = cells.into_iter().map(i8::signum).collect();
        Ok(Self {
            n_times,
            n_spaces,
            cells,
        })
    }

    /// Returns the number of time points.
    #[must_use]
    pub fn n_times(&self) -> usize {
        self.n_times
    }

    /// Returns the number of spatial sites.
    #[must_use]
    pub fn n_spaces(&self) -> usize {
        self.n_spaces
    }

    /// Returns the sign at cell `(i_time, i_space)`.
    ///
    /// # Errors
    /// Returns [`FieldError::CellOutOfBounds`] when the cell is outside the
    /// grid.
    pub fn sign(&self, i_time: usize, i_space: usize) -> Result<i8, FieldError> {
        if i_time >= self.n_times || i_space >= self.n_spaces {
            return Err(FieldError::CellOutOfBounds {
                i_time,
                i_space,
                n_times: self.n_times,
                n_spaces: self.n_spaces,
            });
        }
        Ok(self.cells[i_time * self.n_spaces + i_space])
    }

    /// Cell access for callers that have already validated the coordinate.
    pub(crate) fn sign_unchecked(&self, i_time: usize, i_space: usize) -> i8 {
        self.cells[i_time * self.n_spaces + i_space]
    }

    /// Returns the active (non-zero) cells in row-major (time-major) order.
    #[must_use]
    pub fn active_cells(&self) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &sign)| sign != 0)
            .map(|(index, _)| (index / self.n_spaces, index % self.n_spaces))
            .collect()
    }

    /// Returns the number of active cells.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.cells.iter().filter(|&&sign| sign != 0).count()
    }

    /// Returns the fraction of active cells, for diagnostics.
    #[must_use]
    pub fn density(&self) -> f64 {
        self.active_count() as f64 / self.cells.len() as f64
    }
}

fn check_shape(n_times: usize, n_spaces: usize) -> Result<(), FieldError> {
    if n_times == 0 || n_spaces == 0 {
        return Err(FieldError::InvalidShape { n_times, n_spaces });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn rejects_zero_dimensions() {
        let err = StatMap::zeros(0, 4).expect_err("zero times");
        assert_eq!(err.code(), FieldErrorCode::InvalidShape);
        let err = SignMask::from_cells(2, 0, Vec::new()).expect_err("zero spaces");
        assert_eq!(err.code(), FieldErrorCode::InvalidShape);
    }

    #[test]
    fn rejects_mismatched_buffer() {
        let err = StatMap::from_values(2, 2, vec![0.0; 3]).expect_err("short buffer");
        assert_eq!(
            err,
            FieldError::ValueLengthMismatch {
                got: 3,
                expected: 4,
                n_times: 2,
                n_spaces: 2
            }
        );
    }

    #[test]
    fn get_and_set_round_trip() {
        let mut map = StatMap::zeros(3, 2).expect("valid shape");
        map.set(2, 1, -1.5).expect("cell in range");
        assert_eq!(map.get(2, 1).expect("cell in range"), -1.5);
        let err = map.get(3, 0).expect_err("time out of range");
        assert_eq!(err.code(), FieldErrorCode::CellOutOfBounds);
    }

    #[rstest]
    #[case::positive(Tail::Positive, vec![1, 0, 0, 0])]
    #[case::negative(Tail::Negative, vec![0, -1, -1, 0])]
    #[case::two_sided(Tail::TwoSided, vec![1, -1, 0, 0])]
    fn thresholds_by_tail(#[case] tail: Tail, #[case] expected: Vec<i8>) {
        // Cells: clearly above, clearly below, mildly below, exactly at.
        let map = StatMap::from_values(1, 4, vec![3.0, -3.0, 0.5, 2.0]).expect("valid shape");
        let mask = map.threshold(2.0, tail);
        let got: Vec<i8> = (0..4)
            .map(|s| mask.sign(0, s).expect("cell in range"))
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn threshold_exact_values_stay_inactive() {
        let map = StatMap::from_values(1, 2, vec![2.0, -2.0]).expect("valid shape");
        assert_eq!(map.threshold(2.0, Tail::TwoSided).active_count(), 0);
        assert_eq!(map.threshold(2.0, Tail::Positive).active_count(), 0);
        assert_eq!(map.threshold(-2.0, Tail::Negative).active_count(), 0);
    }

    #[test]
    fn active_cells_are_row_major() {
        let mask =
            SignMask::from_cells(2, 3, vec![0, 1, 0, -1, 0, 1]).expect("valid shape");
        assert_eq!(mask.active_cells(), vec![(0, 1), (1, 0), (1, 2)]);
        assert_eq!(mask.active_count(), 3);
        assert!((mask.density() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn from_cells_clamps_to_signs() {
        let mask = SignMask::from_cells(1, 3, vec![5, -7, 0]).expect("valid shape");
        assert_eq!(mask.sign(0, 0).expect("cell in range"), 1);
        assert_eq!(mask.sign(0, 1).expect("cell in range"), -1);
        assert_eq!(mask.sign(0, 2).expect("cell in range"), 0);
    }

    #[test]
    fn tail_integer_encoding_round_trips() {
        for tail in [Tail::Positive, Tail::Negative, Tail::TwoSided] {
            assert_eq!(Tail::from_i8(tail.as_i8()), Some(tail));
        }
        assert_eq!(Tail::from_i8(2), None);
    }
}
