//! Shared fixtures for the driver integration tests.

use std::sync::Arc;

use permutest_core::{CellStatistic, DesignTable, SpatialAdjacency, StatisticError};

/// Mean difference between two within-subject conditions, with a second key
/// carrying the sign-flipped value.
///
/// `data[cell][row]` is the measurement for one design row at one grid
/// cell; `condition_a[row]` marks the rows whose labels read "condition A".
/// Labels travel through the row order, data does not, so a shuffled order
/// relabels fixed measurements.
pub struct TwoConditionDifference {
    keys: Vec<Arc<str>>,
    n_times: usize,
    n_spaces: usize,
    data: Vec<Vec<f64>>,
    condition_a: Vec<bool>,
}

impl TwoConditionDifference {
    pub fn new(
        n_times: usize,
        n_spaces: usize,
        data: Vec<Vec<f64>>,
        condition_a: Vec<bool>,
    ) -> Self {
        Self {
            keys: vec![Arc::from("diff"), Arc::from("flipped")],
            n_times,
            n_spaces,
            data,
            condition_a,
        }
    }
}

impl CellStatistic for TwoConditionDifference {
    fn name(&self) -> &str {
        "two-condition-difference"
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
    ) -> Result<Vec<f64>, StatisticError> {
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
        let diff = sum_a / n_a as f64 - sum_b / n_b as f64;
        Ok(vec![diff, -diff])
    }
}

/// Alternating A/B rows for `n_subjects` subjects, one pair per subject.
pub fn paired_design(n_subjects: usize) -> DesignTable {
    let labels: Vec<String> = (0..n_subjects).map(|s| format!("s{s}")).collect();
    let rows: Vec<(u64, &str)> = (0..2 * n_subjects)
        .map(|row| (row as u64, labels[row / 2].as_str()))
        .collect();
    DesignTable::from_rows("subject", rows).expect("rows are non-empty")
}

/// Alternating condition flags matching [`paired_design`]: even rows are A.
pub fn paired_conditions(n_subjects: usize) -> Vec<bool> {
    (0..2 * n_subjects).map(|row| row % 2 == 0).collect()
}

/// A chain of spatial sites: 0 — 1 — … — (n−1).
pub fn chain_adjacency(n_spaces: usize) -> SpatialAdjacency {
    let links: Vec<(usize, usize)> = (0..n_spaces - 1).map(|s| (s, s + 1)).collect();
    SpatialAdjacency::from_links(n_spaces, &links).expect("links are in range")
}

/// Grid data with a planted mean shift of `amplitude` on `effect_cells` for
/// the condition-A rows and zeros everywhere else.
pub fn planted_effect(
    n_times: usize,
    n_spaces: usize,
    condition_a: &[bool],
    effect_cells: &[(usize, usize)],
    amplitude: f64,
) -> Vec<Vec<f64>> {
    (0..n_times * n_spaces)
        .map(|index| {
            let cell = (index / n_spaces, index % n_spaces);
            condition_a
                .iter()
                .map(|&is_a| {
                    if is_a && effect_cells.contains(&cell) {
                        amplitude
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}
