//! Signed, optionally confidence-scaled position vectors.

use serde::{Deserialize, Serialize};

/// Position per row, aligned to `indices` (dataset row positions).
///
/// Each value is `sign * size` with `sign ∈ {-1, 0, 1}`; `size` is 1 without
/// confidence sizing and in `[0, conf_cap]` with it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl Position {
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        debug_assert_eq!(indices.len(), values.len());
        Self { indices, values }
    }

    /// All-flat position over `indices`.
    pub fn flat(indices: Vec<usize>) -> Self {
        let values = vec![0.0; indices.len()];
        Self { indices, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of rows carrying a nonzero position.
    pub fn trade_count(&self) -> usize {
        self.values.iter().filter(|v| **v != 0.0).count()
    }

    /// Iterate `(row, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Zero every entry whose row fails `keep`. Returns how many were zeroed.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(usize) -> bool,
    {
        let mut zeroed = 0;
        for (row, value) in self.indices.iter().zip(self.values.iter_mut()) {
            if *value != 0.0 && !keep(*row) {
                *value = 0.0;
                zeroed += 1;
            }
        }
        zeroed
    }
}
