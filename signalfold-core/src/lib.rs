//! SignalFold Core — walk-forward evaluation engine for probabilistic direction signals.
//!
//! This crate contains the pure, single-threaded pieces of the engine:
//! - Domain types (direction labels, per-fold probability outputs, positions)
//! - Purged k-fold splitting with an embargo band
//! - Probability-to-position conversion (threshold search, top percentile,
//!   confidence sizing)
//! - PnL simulation with slippage and a momentum gate
//! - Multi-model consensus (weighted, majority, unanimous)
//! - A polars-backed read-only dataset and forward-return relabeling

pub mod consensus;
pub mod dataset;
pub mod domain;
pub mod labels;
pub mod pnl;
pub mod positions;
pub mod sizing;
pub mod split;

pub use consensus::{combine, ConsensusError, ConsensusPolicy, Member, PolicyKind, TieBreaker};
pub use dataset::{Dataset, DatasetError, HourEncoding};
pub use domain::{ClassProbs, Direction, Position, ProbabilityError, ProbabilityOutput};
pub use pnl::{FoldPnl, FoldResult, MomentumGate, PnlSimulator};
pub use positions::{build_position, PositionError, PositionOutcome};
pub use sizing::{CandidateConfig, ConfidenceSizing, LabelParams, SizingMode};
pub use split::{Fold, FoldIter, SplitConfig, SplitError};
