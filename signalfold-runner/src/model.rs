//! Classifier collaborators.
//!
//! The engine never trains or calibrates anything itself. A model is asked
//! once per fold for class probabilities on the fold's test rows, given the
//! train rows and the current label vector. Failures are opaque
//! (`anyhow::Error`); the sweep skips the fold and carries on.

use anyhow::{anyhow, bail, Context, Result};

use signalfold_core::{Dataset, Direction, Fold, ProbabilityOutput};

/// Probability source for one fold at a time.
pub trait ProbabilityModel {
    /// Stable identifier. Keys the per-fold output cache in pack sweeps.
    fn id(&self) -> &str;

    /// Class probabilities for `fold.test_indices`, in that order.
    ///
    /// `labels` is indexed by dataset row and reflects the candidate's label
    /// parameters, so training on `fold.train_indices` sees the same target
    /// the fold is scored against.
    fn predict_proba(
        &self,
        dataset: &Dataset,
        labels: &[Direction],
        fold: &Fold,
    ) -> Result<ProbabilityOutput>;
}

// ─── Precomputed probability columns ─────────────────────────────────

/// Reads externally produced up/down probabilities straight from the dataset.
#[derive(Debug, Clone)]
pub struct ColumnModel {
    id: String,
    up_column: String,
    down_column: String,
}

impl ColumnModel {
    pub fn new(
        id: impl Into<String>,
        up_column: impl Into<String>,
        down_column: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            up_column: up_column.into(),
            down_column: down_column.into(),
        }
    }
}

impl ProbabilityModel for ColumnModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn predict_proba(
        &self,
        dataset: &Dataset,
        _labels: &[Direction],
        fold: &Fold,
    ) -> Result<ProbabilityOutput> {
        let up = dataset
            .f64_column(&self.up_column)
            .ok_or_else(|| anyhow!("probability column '{}' not found", self.up_column))?;
        let down = dataset
            .f64_column(&self.down_column)
            .ok_or_else(|| anyhow!("probability column '{}' not found", self.down_column))?;

        // Missing cells carry no conviction either way.
        let probabilities = fold
            .test_indices
            .iter()
            .map(|&row| match (up.get(row), down.get(row)) {
                (Some(p_up), Some(p_down)) => Ok(vec![p_up.unwrap_or(0.0), p_down.unwrap_or(0.0)]),
                _ => Err(anyhow!("row {row} is outside the dataset")),
            })
            .collect::<Result<Vec<_>>>()?;

        let output = ProbabilityOutput::new(
            fold.fold_id,
            fold.test_indices.clone(),
            vec![Direction::Up, Direction::Down],
            probabilities,
        )?;
        Ok(output)
    }
}

// ─── No-skill baseline ───────────────────────────────────────────────

/// Predicts the train-fold class frequencies for every test row.
#[derive(Debug, Clone)]
pub struct PriorModel {
    id: String,
}

impl PriorModel {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl ProbabilityModel for PriorModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn predict_proba(
        &self,
        _dataset: &Dataset,
        labels: &[Direction],
        fold: &Fold,
    ) -> Result<ProbabilityOutput> {
        let mut counts = [0usize; 3];
        for &row in &fold.train_indices {
            let label = labels
                .get(row)
                .with_context(|| format!("train row {row} has no label"))?;
            let slot = match label {
                Direction::Up => 0,
                Direction::Down => 1,
                Direction::Flat => 2,
            };
            counts[slot] += 1;
        }

        let total = counts.iter().sum::<usize>();
        let prior: Vec<f64> = if total == 0 {
            vec![1.0 / 3.0; 3]
        } else {
            counts.iter().map(|&c| c as f64 / total as f64).collect()
        };
        if fold.test_indices.iter().any(|&row| row >= labels.len()) {
            bail!("fold {} has test rows beyond the label vector", fold.fold_id);
        }

        let output = ProbabilityOutput::new(
            fold.fold_id,
            fold.test_indices.clone(),
            vec![Direction::Up, Direction::Down, Direction::Flat],
            vec![prior; fold.test_indices.len()],
        )?;
        Ok(output)
    }
}
