//! Guarded grid sweep.
//!
//! The grid size is checked against `max_combos` before any model is called.
//! Surviving candidates must clear `min_trades` (and `min_sharpe` when set);
//! the winner is the first candidate with the highest `avg_sharpe`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use signalfold_core::{CandidateConfig, Dataset, FoldResult, PolicyKind, PositionError};

use crate::config::{ConfigError, EngineConfig};
use crate::evaluate::{CandidateEvaluation, EvaluationContext, FoldOutputCache, PackMember};
use crate::model::ProbabilityModel;

/// Errors from a sweep.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("too many combinations: {combos} exceeds max_combos {max_combos}")]
    TooManyCombinations { combos: usize, max_combos: usize },
    #[error("no configuration met guardrails ({evaluated} candidates evaluated)")]
    NoConfigurationMetGuardrails { evaluated: usize },
    #[error("position error: {0}")]
    Position(#[from] PositionError),
    #[error("consensus pack has no members")]
    EmptyPack,
    #[error("model id '{0}' appears more than once in the pack")]
    DuplicateModelId(String),
    #[error("{policy:?} consensus ignores the sizing mode, but the grid sweeps {entries} sizing entries")]
    SizingAxisUnusedByVoting { policy: PolicyKind, entries: usize },
}

impl SweepError {
    /// Errors that depend only on the configuration, never on the dataset.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            SweepError::Config(_)
                | SweepError::TooManyCombinations { .. }
                | SweepError::EmptyPack
                | SweepError::DuplicateModelId(_)
                | SweepError::SizingAxisUnusedByVoting { .. }
        )
    }
}

// ─── Result ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub avg_sharpe: f64,
    pub total_trades: usize,
}

/// Selected configuration plus how it performed, fold by fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub best_config: CandidateConfig,
    pub best_candidate_id: String,
    pub aggregate_metrics: AggregateMetrics,
    pub fold_results: Vec<FoldResult>,
    pub summary_text: String,
    pub candidates_evaluated: usize,
    pub candidates_passed: usize,
    /// Distinct folds skipped during the sweep. A fold skipped for several
    /// candidates counts once per label vector.
    pub skipped_folds: usize,
}

// ─── Orchestrator ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SweepOrchestrator {
    config: EngineConfig,
}

impl SweepOrchestrator {
    pub fn new(config: EngineConfig) -> Result<Self, SweepError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Enumerate the grid, failing fast when it exceeds `max_combos`.
    pub fn candidates(&self) -> Result<Vec<CandidateConfig>, SweepError> {
        let combos = self.config.grid.combination_count();
        let max_combos = self.config.guardrails.max_combos;
        if combos > max_combos {
            return Err(SweepError::TooManyCombinations { combos, max_combos });
        }
        Ok(self
            .config
            .grid
            .candidates()
            .map_err(ConfigError::from)?)
    }

    /// Sweep the grid with a single model.
    pub fn sweep(
        &self,
        dataset: &Dataset,
        model: &dyn ProbabilityModel,
    ) -> Result<SweepResult, SweepError> {
        let candidates = self.candidates()?;
        info!(
            candidates = candidates.len(),
            rows = dataset.height(),
            model = model.id(),
            "sweep started"
        );

        let mut ctx = EvaluationContext::new(dataset, &self.config);
        let evaluations = candidates
            .iter()
            .map(|candidate| ctx.evaluate_single(model, candidate))
            .collect::<Result<Vec<_>, _>>()?;
        self.select(evaluations, ctx.skipped_folds())
    }

    /// Sweep the grid with a consensus pack. Each member's fold outputs are
    /// computed once and shared by every candidate.
    pub fn sweep_pack(
        &self,
        dataset: &Dataset,
        pack: &[PackMember<'_>],
    ) -> Result<SweepResult, SweepError> {
        let candidates = self.candidates()?;
        check_pack(pack)?;
        self.check_voting_grid()?;
        info!(
            candidates = candidates.len(),
            rows = dataset.height(),
            members = pack.len(),
            policy = ?self.config.consensus.policy,
            "pack sweep started"
        );

        let mut ctx = EvaluationContext::new(dataset, &self.config);
        let mut cache = FoldOutputCache::new();
        let evaluations = candidates
            .iter()
            .map(|candidate| {
                ctx.evaluate_pack(pack, &self.config.consensus, candidate, &mut cache)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            model_calls = cache.model_calls(),
            cached = cache.len(),
            "fold outputs computed"
        );
        self.select(evaluations, ctx.skipped_folds())
    }

    /// Evaluate one candidate with a single model, without guardrails.
    pub fn evaluate(
        &self,
        dataset: &Dataset,
        model: &dyn ProbabilityModel,
        candidate: &CandidateConfig,
    ) -> Result<CandidateEvaluation, SweepError> {
        let mut ctx = EvaluationContext::new(dataset, &self.config);
        Ok(ctx.evaluate_single(model, candidate)?)
    }

    /// Voting policies never read the sizing mode, so sweeping it would only
    /// produce identical candidates.
    fn check_voting_grid(&self) -> Result<(), SweepError> {
        let policy = self.config.consensus.policy;
        let grid = &self.config.grid;
        let entries = grid.thresholds_list.len().max(grid.top_pct_list.len());
        if policy != PolicyKind::Weighted && entries > 1 {
            return Err(SweepError::SizingAxisUnusedByVoting { policy, entries });
        }
        Ok(())
    }

    fn select(
        &self,
        evaluations: Vec<CandidateEvaluation>,
        skipped_folds: usize,
    ) -> Result<SweepResult, SweepError> {
        let evaluated = evaluations.len();
        let mut passed = 0;
        let mut best: Option<CandidateEvaluation> = None;

        for eval in evaluations {
            debug!(
                candidate = %eval.candidate_id,
                avg_sharpe = eval.avg_sharpe,
                total_trades = eval.total_trades,
                folds = eval.fold_results.len(),
                "candidate evaluated"
            );
            if let Err(rejection) = self
                .config
                .guardrails
                .check(eval.avg_sharpe, eval.total_trades)
            {
                debug!(candidate = %eval.candidate_id, %rejection, "guardrail rejected candidate");
                continue;
            }
            passed += 1;
            if best.as_ref().map_or(true, |b| eval.avg_sharpe > b.avg_sharpe) {
                best = Some(eval);
            }
        }

        let Some(best) = best else {
            return Err(SweepError::NoConfigurationMetGuardrails { evaluated });
        };

        let summary_text = format!(
            "best {} ({}): avg_sharpe={:.4} total_trades={} over {} folds; {passed}/{evaluated} candidates passed guardrails",
            best.candidate_id,
            best.config.describe(),
            best.avg_sharpe,
            best.total_trades,
            best.fold_results.len(),
        );
        info!(
            candidate = %best.candidate_id,
            avg_sharpe = best.avg_sharpe,
            total_trades = best.total_trades,
            passed,
            evaluated,
            skipped_folds,
            "best configuration selected"
        );

        Ok(SweepResult {
            aggregate_metrics: AggregateMetrics {
                avg_sharpe: best.avg_sharpe,
                total_trades: best.total_trades,
            },
            best_candidate_id: best.candidate_id,
            best_config: best.config,
            fold_results: best.fold_results,
            summary_text,
            candidates_evaluated: evaluated,
            candidates_passed: passed,
            skipped_folds,
        })
    }
}

fn check_pack(pack: &[PackMember<'_>]) -> Result<(), SweepError> {
    if pack.is_empty() {
        return Err(SweepError::EmptyPack);
    }
    let mut seen = HashSet::new();
    for member in pack {
        if !seen.insert(member.model.id()) {
            return Err(SweepError::DuplicateModelId(member.model.id().to_string()));
        }
    }
    Ok(())
}
