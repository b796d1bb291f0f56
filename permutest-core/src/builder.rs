//! Builder for configuring permutation tests.
//!
//! Collects the recognised configuration surface — threshold, tail,
//! permutation count, seed and tracked keys — and validates it before
//! constructing a [`PermutationTest`].

use std::{num::NonZeroUsize, sync::Arc};

use crate::{
    Result,
    error::PermutationError,
    field::Tail,
    permutation::PermutationTest,
};

/// Configures and constructs [`PermutationTest`] instances.
///
/// The clustering threshold has no sensible default, so it is required up
/// front; everything else starts from conventional defaults (two-sided
/// tail, 1000 permutations, seed 0, all keys tracked).
///
/// # Examples
/// ```
/// use permutest_core::{PermutationTestBuilder, Tail};
///
/// let test = PermutationTestBuilder::new(2.0)
///     .with_tail(Tail::Positive)
///     .with_n_permutations(500)
///     .with_seed(42)
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(test.threshold(), 2.0);
/// assert_eq!(test.tail(), Tail::Positive);
/// assert_eq!(test.n_permutations().get(), 500);
/// ```
#[derive(Debug, Clone)]
pub struct PermutationTestBuilder {
    threshold: f64,
    tail: Tail,
    n_permutations: usize,
    seed: u64,
    keys: Option<Vec<Arc<str>>>,
}

impl PermutationTestBuilder {
    /// Creates a builder for the given clustering threshold.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            tail: Tail::TwoSided,
            n_permutations: 1000,
            seed: 0,
            keys: None,
        }
    }

    /// Returns the configured clustering threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Sets which direction of extremity counts as significant.
    #[must_use]
    pub fn with_tail(mut self, tail: Tail) -> Self {
        self.tail = tail;
        self
    }

    /// Returns the configured tail.
    #[must_use]
    pub fn tail(&self) -> Tail {
        self.tail
    }

    /// Overrides the number of label permutations.
    #[must_use]
    pub fn with_n_permutations(mut self, n_permutations: usize) -> Self {
        self.n_permutations = n_permutations;
        self
    }

    /// Returns the configured permutation count.
    #[must_use]
    pub fn n_permutations(&self) -> usize {
        self.n_permutations
    }

    /// Sets the seed driving the within-group shuffles.
    ///
    /// Two runs with the same seed, design and statistic produce identical
    /// null distributions.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Returns the configured seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Restricts the run to a subset of the statistic's keys.
    ///
    /// By default every key the statistic exposes is tracked and clustered.
    ///
    /// # Examples
    /// ```
    /// use permutest_core::PermutationTestBuilder;
    ///
    /// let builder = PermutationTestBuilder::new(2.0).with_keys(["t_value"]);
    /// assert_eq!(builder.keys(), Some(&["t_value".into()][..]));
    /// ```
    #[must_use]
    pub fn with_keys<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<str>>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the configured key selection, if any.
    #[must_use]
    pub fn keys(&self) -> Option<&[Arc<str>]> {
        self.keys.as_deref()
    }

    /// Validates the configuration and constructs a [`PermutationTest`].
    ///
    /// # Errors
    /// Returns [`PermutationError::InvalidThreshold`] for a non-finite
    /// threshold, [`PermutationError::InvalidPermutationCount`] for zero
    /// permutations and [`PermutationError::EmptyKeySelection`] for an
    /// explicit but empty key list.
    pub fn build(self) -> Result<PermutationTest> {
        if !self.threshold.is_finite() {
            return Err(PermutationError::InvalidThreshold {
                got: self.threshold,
            });
        }
        let n_permutations = NonZeroUsize::new(self.n_permutations).ok_or(
            PermutationError::InvalidPermutationCount {
                got: self.n_permutations,
            },
        )?;
        if self.keys.as_ref().is_some_and(Vec::is_empty) {
            return Err(PermutationError::EmptyKeySelection);
        }
        Ok(PermutationTest::new(
            self.threshold,
            self.tail,
            n_permutations,
            self.seed,
            self.keys,
        ))
    }
}
