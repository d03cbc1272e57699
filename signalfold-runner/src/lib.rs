//! SignalFold Runner — sweep orchestration on top of `signalfold-core`.
//!
//! This crate provides:
//! - TOML engine configuration
//! - The classifier collaborator trait and two reference models
//! - Grid enumeration with guardrails
//! - Per-candidate fold evaluation with a per-sweep fold-output cache
//! - The sweep orchestrator and multi-symbol batches

pub mod batch;
pub mod config;
pub mod evaluate;
pub mod grid;
pub mod model;
pub mod sweep;

pub use batch::{run_batch, BatchReport, SymbolFailure, SymbolInput, SymbolResult};
pub use config::{ConfigError, EngineConfig};
pub use evaluate::{CandidateEvaluation, EvaluationContext, FoldOutputCache, PackMember};
pub use grid::{GridError, GridSpec, Guardrails, Rejection};
pub use model::{ColumnModel, PriorModel, ProbabilityModel};
pub use sweep::{AggregateMetrics, SweepError, SweepOrchestrator, SweepResult};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn sweep_outputs_are_send_sync() {
        assert_send::<SweepResult>();
        assert_sync::<SweepResult>();
        assert_send::<BatchReport>();
        assert_sync::<BatchReport>();
        assert_send::<SweepError>();
        assert_sync::<SweepError>();
    }

    #[test]
    fn orchestrator_and_models_are_send_sync() {
        assert_send::<SweepOrchestrator>();
        assert_sync::<SweepOrchestrator>();
        assert_send::<ColumnModel>();
        assert_sync::<ColumnModel>();
        assert_send::<PriorModel>();
        assert_sync::<PriorModel>();
        assert_send::<FoldOutputCache>();
    }
}
