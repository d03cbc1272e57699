//! Per-fold classifier output.
//!
//! A `ProbabilityOutput` is produced once per fold per model by the external
//! classifier and is never mutated afterwards. Everything downstream only
//! needs the up/down columns, extracted as [`ClassProbs`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Direction;

/// Errors raised when a classifier hands back a malformed matrix.
#[derive(Debug, Error, PartialEq)]
pub enum ProbabilityError {
    #[error("probability matrix has {rows} rows but fold has {expected} test indices")]
    RowCountMismatch { rows: usize, expected: usize },
    #[error("row {row} has {width} probabilities but {classes} classes were declared")]
    WidthMismatch {
        row: usize,
        width: usize,
        classes: usize,
    },
    #[error("class {0} is declared more than once")]
    DuplicateClass(Direction),
}

/// Class probabilities for one fold's test rows, row-major and aligned to `classes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityOutput {
    pub fold_id: usize,
    pub test_indices: Vec<usize>,
    pub classes: Vec<Direction>,
    pub probabilities: Vec<Vec<f64>>,
}

impl ProbabilityOutput {
    /// Validating constructor: one row per test index, one column per class.
    pub fn new(
        fold_id: usize,
        test_indices: Vec<usize>,
        classes: Vec<Direction>,
        probabilities: Vec<Vec<f64>>,
    ) -> Result<Self, ProbabilityError> {
        if probabilities.len() != test_indices.len() {
            return Err(ProbabilityError::RowCountMismatch {
                rows: probabilities.len(),
                expected: test_indices.len(),
            });
        }
        for (i, class) in classes.iter().enumerate() {
            if classes[..i].contains(class) {
                return Err(ProbabilityError::DuplicateClass(*class));
            }
        }
        if let Some((row, width)) = probabilities
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, w)| *w != classes.len())
        {
            return Err(ProbabilityError::WidthMismatch {
                row,
                width,
                classes: classes.len(),
            });
        }
        Ok(Self {
            fold_id,
            test_indices,
            classes,
            probabilities,
        })
    }

    pub fn len(&self) -> usize {
        self.test_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_indices.is_empty()
    }

    fn column(&self, class: Direction) -> Vec<f64> {
        match self.classes.iter().position(|c| *c == class) {
            Some(col) => self
                .probabilities
                .iter()
                .map(|row| row.get(col).copied().unwrap_or(0.0))
                .collect(),
            None => vec![0.0; self.len()],
        }
    }

    /// Extract the up/down columns. A class the model never saw reads as 0.
    pub fn class_probs(&self) -> ClassProbs {
        ClassProbs {
            p_up: self.column(Direction::Up),
            p_down: self.column(Direction::Down),
        }
    }
}

/// The two probability columns the position logic works with.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassProbs {
    pub p_up: Vec<f64>,
    pub p_down: Vec<f64>,
}

impl ClassProbs {
    pub fn len(&self) -> usize {
        self.p_up.len()
    }

    pub fn is_empty(&self) -> bool {
        self.p_up.is_empty()
    }

    /// Raw confidence `max(p_up, p_down)` of row `i`.
    pub fn max_prob(&self, i: usize) -> f64 {
        self.p_up[i].max(self.p_down[i])
    }
}
