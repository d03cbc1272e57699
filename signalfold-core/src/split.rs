//! Purged k-fold splitting with an embargo band.
//!
//! Rows are divided into `n_splits` contiguous blocks whose sizes differ by at
//! most one (the first `n % n_splits` blocks take the extra row). Block k is
//! the test set of fold k. The train set is every row outside the test block
//! widened on both sides by `floor(test_len * embargo_fraction)` rows, clipped
//! to `[0, n)`. Adjacency is the only purge; there is no label-overlap pass.
//! With fewer rows than folds the trailing blocks are empty.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Configuration ───────────────────────────────────────────────────

/// Fold count and embargo width for a purged k-fold split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Number of folds (>= 1).
    pub n_splits: usize,
    /// Embargo width as a fraction of the test block, in `[0, 1)`.
    pub embargo_fraction: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            n_splits: 5,
            embargo_fraction: 0.01,
        }
    }
}

/// Errors from split configuration.
#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("n_splits must be at least 1")]
    ZeroSplits,
    #[error("embargo_fraction must be in [0, 1), got {0}")]
    InvalidEmbargo(f64),
}

impl SplitConfig {
    pub fn validate(&self) -> Result<(), SplitError> {
        if self.n_splits == 0 {
            return Err(SplitError::ZeroSplits);
        }
        if !(0.0..1.0).contains(&self.embargo_fraction) {
            return Err(SplitError::InvalidEmbargo(self.embargo_fraction));
        }
        Ok(())
    }

    /// Lazily yield the folds for `n_rows` rows, in block order.
    pub fn split(&self, n_rows: usize) -> Result<FoldIter, SplitError> {
        self.validate()?;
        Ok(FoldIter {
            n_rows,
            n_splits: self.n_splits,
            embargo_fraction: self.embargo_fraction,
            next_fold: 0,
        })
    }
}

// ─── Folds ───────────────────────────────────────────────────────────

/// One train/test partition of row positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub fold_id: usize,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Test block bounds for fold `k` of `n_splits` over `n_rows` rows. Empty
/// when `n_splits` is 0.
pub fn test_block(n_rows: usize, n_splits: usize, k: usize) -> Range<usize> {
    if n_splits == 0 {
        return 0..0;
    }
    let base = n_rows / n_splits;
    let extra = n_rows % n_splits;
    let start = k * base + k.min(extra);
    let len = base + usize::from(k < extra);
    start..start + len
}

/// Rows excluded from training for a test block: the block plus the embargo
/// band on each side, clipped to the row range.
pub fn embargo_band(test: &Range<usize>, n_rows: usize, embargo_fraction: f64) -> Range<usize> {
    let embargo_len = (test.len() as f64 * embargo_fraction).floor() as usize;
    let lo = test.start.saturating_sub(embargo_len);
    let hi = (test.end + embargo_len).min(n_rows);
    lo..hi
}

/// Generator over the folds of one split. Nothing is cached.
#[derive(Debug, Clone)]
pub struct FoldIter {
    n_rows: usize,
    n_splits: usize,
    embargo_fraction: f64,
    next_fold: usize,
}

impl Iterator for FoldIter {
    type Item = Fold;

    fn next(&mut self) -> Option<Fold> {
        if self.next_fold >= self.n_splits {
            return None;
        }
        let k = self.next_fold;
        self.next_fold += 1;

        let test = test_block(self.n_rows, self.n_splits, k);
        let excluded = embargo_band(&test, self.n_rows, self.embargo_fraction);
        let train_indices = (0..excluded.start).chain(excluded.end..self.n_rows).collect();

        Some(Fold {
            fold_id: k,
            train_indices,
            test_indices: test.collect(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.n_splits - self.next_fold;
        (left, Some(left))
    }
}

impl ExactSizeIterator for FoldIter {}
