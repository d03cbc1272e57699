//! Engine configuration, read from a single TOML document.
//!
//! ```toml
//! target_column = "label"
//! price_column = "close"
//!
//! [split]
//! n_splits = 5
//! embargo_fraction = 0.01
//!
//! [costs]
//! slippage_bps = 2.0
//!
//! [momentum_gate]
//! enabled = true
//! column = "momentum"
//! min_value = 0.0
//!
//! [consensus]
//! policy = "majority"
//! min_score = 0.55
//!
//! [grid]
//! thresholds_list = [[0.5, 0.6, 0.7]]
//! size_by_conf_list = [false, true]
//!
//! [guardrails]
//! max_combos = 200
//! min_trades = 10
//! ```
//!
//! Every section and field is optional and falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use signalfold_core::{
    ConsensusPolicy, HourEncoding, LabelParams, MomentumGate, PnlSimulator, SplitConfig,
    SplitError,
};

use crate::grid::{GridError, GridSpec, Guardrails};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("split: {0}")]
    Split(#[from] SplitError),
    #[error("grid: {0}")]
    Grid(#[from] GridError),
    #[error("slippage_bps must be finite and >= 0, got {0}")]
    InvalidSlippage(f64),
    #[error("consensus.min_score must be in [0, 1], got {0}")]
    InvalidMinScore(f64),
    #[error("consensus.min_quorum must be finite and >= 0, got {0}")]
    InvalidQuorum(f64),
    #[error("{0} must not be empty")]
    EmptyColumnName(&'static str),
}

// ─── Sections ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// Charged once per nonzero position, in basis points.
    pub slippage_bps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumGateConfig {
    pub enabled: bool,
    pub column: String,
    pub min_value: f64,
}

impl Default for MomentumGateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            column: "momentum".to_string(),
            min_value: 0.0,
        }
    }
}

impl MomentumGateConfig {
    pub fn gate(&self) -> Option<MomentumGate> {
        self.enabled.then(|| MomentumGate {
            column: self.column.clone(),
            min_value: self.min_value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoursConfig {
    /// Column holding the hour of each row. `None` disables hour filtering.
    pub column: Option<String>,
    pub encoding: HourEncoding,
}

impl Default for HoursConfig {
    fn default() -> Self {
        Self {
            column: Some("hour".to_string()),
            encoding: HourEncoding::Hour,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Label parameters the target column was built with. Candidates carrying
    /// exactly these parameters reuse the target column.
    pub default: Option<LabelParams>,
}

// ─── Engine configuration ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub target_column: String,
    /// Source for forward-return relabeling.
    pub price_column: String,
    pub split: SplitConfig,
    pub costs: CostConfig,
    pub momentum_gate: MomentumGateConfig,
    pub hours: HoursConfig,
    pub labels: LabelConfig,
    pub consensus: ConsensusPolicy,
    pub grid: GridSpec,
    pub guardrails: Guardrails,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_column: "label".to_string(),
            price_column: "close".to_string(),
            split: SplitConfig::default(),
            costs: CostConfig::default(),
            momentum_gate: MomentumGateConfig::default(),
            hours: HoursConfig::default(),
            labels: LabelConfig::default(),
            consensus: ConsensusPolicy::default(),
            grid: GridSpec::default(),
            guardrails: Guardrails::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_column.is_empty() {
            return Err(ConfigError::EmptyColumnName("target_column"));
        }
        if self.momentum_gate.enabled && self.momentum_gate.column.is_empty() {
            return Err(ConfigError::EmptyColumnName("momentum_gate.column"));
        }
        self.split.validate()?;
        let bps = self.costs.slippage_bps;
        if !bps.is_finite() || bps < 0.0 {
            return Err(ConfigError::InvalidSlippage(bps));
        }
        let min_score = self.consensus.min_score;
        if !(0.0..=1.0).contains(&min_score) {
            return Err(ConfigError::InvalidMinScore(min_score));
        }
        if let Some(q) = self.consensus.min_quorum {
            if !q.is_finite() || q < 0.0 {
                return Err(ConfigError::InvalidQuorum(q));
            }
        }
        self.grid.validate()?;
        Ok(())
    }

    /// PnL simulator with this configuration's costs and momentum gate.
    pub fn simulator(&self) -> PnlSimulator {
        let simulator = PnlSimulator::new(self.costs.slippage_bps);
        match self.momentum_gate.gate() {
            Some(gate) => simulator.with_momentum_gate(gate),
            None => simulator,
        }
    }
}
