//! Sweep grid axes, Cartesian enumeration and guardrails.
//!
//! Each axis is a list of values. An empty axis contributes a single no-op
//! value, so an all-empty grid yields exactly one default candidate.
//! `thresholds_list` and `top_pct_list` feed the same sizing axis and may
//! not both be given.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use signalfold_core::{CandidateConfig, LabelParams, SizingMode};

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("thresholds_list and top_pct_list are mutually exclusive")]
    ConflictingSizingAxes,
    #[error("thresholds_list entry {0} is empty")]
    EmptyThresholdList(usize),
    #[error("threshold must be in [0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error("top_pct must be in (0, 1], got {0}")]
    InvalidTopPct(f64),
    #[error("conf_cap must be finite and >= 0, got {0}")]
    InvalidConfCap(f64),
    #[error("hour must be in 0..=23, got {0}")]
    InvalidHour(u32),
    #[error("label horizon must be at least 1")]
    ZeroHorizon,
}

// ─── Grid axes ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    /// Each entry is one threshold list searched per fold.
    pub thresholds_list: Vec<Vec<f64>>,
    pub top_pct_list: Vec<f64>,
    /// Each entry is one allowed-hours set; an empty set means any hour.
    pub allowed_hours_list: Vec<Vec<u32>>,
    pub label_params_list: Vec<LabelParams>,
    pub size_by_conf_list: Vec<bool>,
    pub conf_cap_list: Vec<f64>,
}

impl GridSpec {
    pub fn validate(&self) -> Result<(), GridError> {
        if !self.thresholds_list.is_empty() && !self.top_pct_list.is_empty() {
            return Err(GridError::ConflictingSizingAxes);
        }
        for (i, list) in self.thresholds_list.iter().enumerate() {
            if list.is_empty() {
                return Err(GridError::EmptyThresholdList(i));
            }
            if let Some(&t) = list.iter().find(|t| !(0.0..=1.0).contains(*t)) {
                return Err(GridError::InvalidThreshold(t));
            }
        }
        if let Some(&p) = self
            .top_pct_list
            .iter()
            .find(|p| !(**p > 0.0 && **p <= 1.0))
        {
            return Err(GridError::InvalidTopPct(p));
        }
        if let Some(&h) = self.allowed_hours_list.iter().flatten().find(|h| **h > 23) {
            return Err(GridError::InvalidHour(h));
        }
        if self.label_params_list.iter().any(|p| p.horizon == 0) {
            return Err(GridError::ZeroHorizon);
        }
        if let Some(&c) = self
            .conf_cap_list
            .iter()
            .find(|c| !c.is_finite() || **c < 0.0)
        {
            return Err(GridError::InvalidConfCap(c));
        }
        Ok(())
    }

    /// Number of candidates the grid expands to. Saturates instead of
    /// overflowing so the `max_combos` check stays meaningful.
    pub fn combination_count(&self) -> usize {
        let sizing = self.thresholds_list.len() + self.top_pct_list.len();
        [
            sizing,
            self.allowed_hours_list.len(),
            self.label_params_list.len(),
            self.size_by_conf_list.len(),
            self.conf_cap_list.len(),
        ]
        .iter()
        .fold(1usize, |acc, &len| acc.saturating_mul(len.max(1)))
    }

    /// Expand the Cartesian product, sizing axis outermost.
    pub fn candidates(&self) -> Result<Vec<CandidateConfig>, GridError> {
        self.validate()?;

        let sizing_axis = self.sizing_axis();
        let hours_axis: Vec<Option<BTreeSet<u32>>> = if self.allowed_hours_list.is_empty() {
            vec![None]
        } else {
            self.allowed_hours_list
                .iter()
                .map(|hours| {
                    if hours.is_empty() {
                        None
                    } else {
                        Some(hours.iter().copied().collect())
                    }
                })
                .collect()
        };
        let label_axis: Vec<Option<LabelParams>> = if self.label_params_list.is_empty() {
            vec![None]
        } else {
            self.label_params_list.iter().copied().map(Some).collect()
        };
        let conf_axis = or_single(&self.size_by_conf_list, false);
        let cap_axis = or_single(&self.conf_cap_list, 1.0);

        let mut candidates = Vec::with_capacity(self.combination_count());
        for sizing in &sizing_axis {
            for hours in &hours_axis {
                for label_params in &label_axis {
                    for &size_by_conf in &conf_axis {
                        for &conf_cap in &cap_axis {
                            candidates.push(CandidateConfig {
                                sizing: sizing.clone(),
                                allowed_hours: hours.clone(),
                                label_params: *label_params,
                                size_by_conf,
                                conf_cap,
                            });
                        }
                    }
                }
            }
        }
        Ok(candidates)
    }

    fn sizing_axis(&self) -> Vec<SizingMode> {
        if !self.thresholds_list.is_empty() {
            self.thresholds_list
                .iter()
                .map(|ts| SizingMode::Threshold(ts.clone()))
                .collect()
        } else if !self.top_pct_list.is_empty() {
            self.top_pct_list
                .iter()
                .map(|&p| SizingMode::TopPercentile(p))
                .collect()
        } else {
            vec![SizingMode::default()]
        }
    }
}

fn or_single<T: Copy>(axis: &[T], fallback: T) -> Vec<T> {
    if axis.is_empty() {
        vec![fallback]
    } else {
        axis.to_vec()
    }
}

// ─── Guardrails ──────────────────────────────────────────────────────

/// Limits a sweep must respect: a pre-flight cap on grid size and the
/// minimums a candidate must clear to be selectable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Guardrails {
    pub max_combos: usize,
    pub min_trades: usize,
    pub min_sharpe: Option<f64>,
}

impl Default for Guardrails {
    fn default() -> Self {
        Self {
            max_combos: 500,
            min_trades: 1,
            min_sharpe: None,
        }
    }
}

/// Why a candidate was not eligible for selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    TooFewTrades { trades: usize, min_trades: usize },
    SharpeBelowFloor { sharpe: f64, min_sharpe: f64 },
    NonFiniteSharpe,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::TooFewTrades { trades, min_trades } => {
                write!(f, "{trades} trades < min_trades {min_trades}")
            }
            Rejection::SharpeBelowFloor { sharpe, min_sharpe } => {
                write!(f, "avg_sharpe {sharpe:.4} < min_sharpe {min_sharpe}")
            }
            Rejection::NonFiniteSharpe => write!(f, "avg_sharpe is not finite"),
        }
    }
}

impl Guardrails {
    pub fn check(&self, avg_sharpe: f64, total_trades: usize) -> Result<(), Rejection> {
        if total_trades < self.min_trades {
            return Err(Rejection::TooFewTrades {
                trades: total_trades,
                min_trades: self.min_trades,
            });
        }
        if !avg_sharpe.is_finite() {
            return Err(Rejection::NonFiniteSharpe);
        }
        if let Some(min_sharpe) = self.min_sharpe {
            if avg_sharpe < min_sharpe {
                return Err(Rejection::SharpeBelowFloor {
                    sharpe: avg_sharpe,
                    min_sharpe,
                });
            }
        }
        Ok(())
    }
}
