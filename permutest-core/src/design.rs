//! Design-table row orders and group-scoped permutations.
//!
//! The driver never sees regressor values, only the grouping structure of
//! the design rows. A [`DesignTable`] records each row's observation id and
//! group label; permutations are full within-group shuffles of the row
//! order, so repeated-measures structure survives relabelling.

use std::{collections::HashMap, sync::Arc};

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

/// Errors raised while constructing a [`DesignTable`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DesignError {
    /// A design table must contain at least one row.
    #[error("design table `{group_key}` has no rows")]
    EmptyDesign {
        /// The grouping column the table was built from.
        group_key: Arc<str>,
    },
}

impl DesignError {
    /// Returns a stable, machine-readable error code for the variant.
    #[must_use]
    pub const fn code(&self) -> DesignErrorCode {
        match self {
            Self::EmptyDesign { .. } => DesignErrorCode::EmptyDesign,
        }
    }
}

/// Machine-readable error codes for [`DesignError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DesignErrorCode {
    /// A design table must contain at least one row.
    EmptyDesign,
}

impl DesignErrorCode {
    /// Returns the symbolic identifier for logging surfaces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyDesign => "DESIGN_EMPTY",
        }
    }
}

/// Grouping structure of a regressor/label table.
///
/// # Examples
/// ```
/// use permutest_core::DesignTable;
/// use rand::{SeedableRng, rngs::SmallRng};
///
/// let design = DesignTable::from_rows(
///     "subject",
///     [(10, "s1"), (11, "s1"), (20, "s2"), (21, "s2")],
/// )?;
/// assert_eq!(design.len(), 4);
/// assert_eq!(design.identity_order(), vec![0, 1, 2, 3]);
///
/// let mut rng = SmallRng::seed_from_u64(3);
/// let order = design.shuffled_order(&mut rng);
/// // Rows only ever trade places within their own group.
/// assert!(order[..2].iter().all(|&row| row < 2));
/// assert!(order[2..].iter().all(|&row| row >= 2));
/// # Ok::<(), permutest_core::DesignError>(())
/// ```
#[derive(Clone, Debug)]
pub struct DesignTable {
    group_key: Arc<str>,
    observations: Vec<u64>,
    /// Row indices of each group, groups in first-appearance order.
    group_members: Vec<Vec<usize>>,
}

impl DesignTable {
    /// Builds a table from `(observation id, group label)` rows.
    ///
    /// `group_key` names the column the labels came from; it only appears in
    /// diagnostics. Group identity is label equality and the iteration order
    /// of groups is their first appearance, which keeps the random stream
    /// consumption — and therefore seeded runs — deterministic.
    ///
    /// # Errors
    /// Returns [`DesignError::EmptyDesign`] when `rows` is empty.
    pub fn from_rows<'a, I>(group_key: &str, rows: I) -> Result<Self, DesignError>
    where
        I: IntoIterator<Item = (u64, &'a str)>,
    {
        let mut observations = Vec::new();
        let mut group_members: Vec<Vec<usize>> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();
        for (row, (observation, group)) in rows.into_iter().enumerate() {
            observations.push(observation);
            if let Some(&index) = group_index.get(group) {
                group_members[index].push(row);
            } else {
                group_index.insert(group.to_owned(), group_members.len());
                group_members.push(vec![row]);
            }
        }
        if observations.is_empty() {
            return Err(DesignError::EmptyDesign {
                group_key: Arc::from(group_key),
            });
        }
        Ok(Self {
            group_key: Arc::from(group_key),
            observations,
            group_members,
        })
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Returns whether the table has no rows; always `false` once built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Returns the grouping column this table was built from.
    #[must_use]
    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    /// Returns the number of distinct groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.group_members.len()
    }

    /// Returns the observation id of each row in row order.
    #[must_use]
    pub fn observations(&self) -> &[u64] {
        &self.observations
    }

    /// Returns the unpermuted row order.
    #[must_use]
    pub fn identity_order(&self) -> Vec<usize> {
        (0..self.observations.len()).collect()
    }

    /// Draws one group-scoped permutation of the row order.
    ///
    /// Every group's rows are shuffled among themselves (a full shuffle
    /// without replacement, not a bootstrap); rows never move between
    /// groups. Groups are consumed in first-appearance order, so one seeded
    /// generator replays the same sequence of orders.
    #[must_use]
    pub fn shuffled_order<R: Rng>(&self, rng: &mut R) -> Vec<usize> {
        let mut order = self.identity_order();
        for members in &self.group_members {
            let mut shuffled = members.clone();
            shuffled.shuffle(rng);
            for (&slot, &row) in members.iter().zip(&shuffled) {
                order[slot] = row;
            }
        }
        order
    }
}
