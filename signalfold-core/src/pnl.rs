//! PnL simulation for one fold's position vector.
//!
//! `pnl[i] = position[i] * direction(label[i]) - cost` where cost is
//! `slippage_bps / 10_000` on every row holding a nonzero position. The
//! optional momentum gate zeroes positions whose momentum feature is below a
//! floor before anything is scored; rows without a momentum value pass.

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, Position};

/// Additive guard in the Sharpe-like denominator.
pub const SHARPE_EPSILON: f64 = 1e-9;

/// Zero positions whose momentum feature falls below `min_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumGate {
    /// Dataset column holding the momentum feature.
    pub column: String,
    pub min_value: f64,
}

impl MomentumGate {
    /// Whether a row with this momentum value may hold a position.
    /// Missing values pass (fail-open).
    pub fn passes(&self, momentum: Option<f64>) -> bool {
        match momentum {
            Some(v) if !v.is_nan() => v >= self.min_value,
            _ => true,
        }
    }
}

/// Per-row PnL of one fold plus its aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldPnl {
    pub pnl: Vec<f64>,
    pub cumulative_return: f64,
    pub sharpe_like_ratio: f64,
    pub trade_count: usize,
    /// Positions zeroed by the momentum gate.
    pub gated: usize,
}

/// Scored outcome of one fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold_id: usize,
    pub threshold_used: Option<f64>,
    pub cumulative_return: f64,
    pub sharpe_like_ratio: f64,
    pub trade_count: usize,
}

impl FoldResult {
    pub fn from_pnl(fold_id: usize, threshold_used: Option<f64>, pnl: &FoldPnl) -> Self {
        Self {
            fold_id,
            threshold_used,
            cumulative_return: pnl.cumulative_return,
            sharpe_like_ratio: pnl.sharpe_like_ratio,
            trade_count: pnl.trade_count,
        }
    }
}

/// Cost and gating settings for PnL simulation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PnlSimulator {
    pub slippage_bps: f64,
    pub momentum_gate: Option<MomentumGate>,
}

impl PnlSimulator {
    pub fn new(slippage_bps: f64) -> Self {
        Self {
            slippage_bps,
            momentum_gate: None,
        }
    }

    pub fn with_momentum_gate(mut self, gate: MomentumGate) -> Self {
        self.momentum_gate = Some(gate);
        self
    }

    /// Per-trade cost as a fraction.
    pub fn cost_per_trade(&self) -> f64 {
        self.slippage_bps / 10_000.0
    }

    /// Simulate one fold.
    ///
    /// `labels` and `momentum` are indexed by dataset row (the position's
    /// `indices`). A missing momentum column means every row passes the gate.
    pub fn simulate(
        &self,
        position: &Position,
        labels: &[Direction],
        momentum: Option<&[Option<f64>]>,
    ) -> FoldPnl {
        let mut position = position.clone();
        let gated = match (&self.momentum_gate, momentum) {
            (Some(gate), Some(values)) => {
                position.retain_rows(|row| gate.passes(values.get(row).copied().flatten()))
            }
            _ => 0,
        };

        let cost = self.cost_per_trade();
        let pnl: Vec<f64> = position
            .iter()
            .map(|(row, value)| {
                if value == 0.0 {
                    return 0.0;
                }
                let direction = labels.get(row).copied().unwrap_or(Direction::Flat);
                value * direction.sign() - cost
            })
            .collect();

        FoldPnl {
            cumulative_return: pnl.iter().sum(),
            sharpe_like_ratio: sharpe_like(&pnl),
            trade_count: position.trade_count(),
            gated,
            pnl,
        }
    }
}

// ─── Statistics ──────────────────────────────────────────────────────

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation.
pub fn std_dev(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64;
    var.sqrt()
}

/// `mean / (stdev + ε)`, not annualized.
pub fn sharpe_like(pnl: &[f64]) -> f64 {
    mean(pnl) / (std_dev(pnl) + SHARPE_EPSILON)
}
