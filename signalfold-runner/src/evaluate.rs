//! Candidate evaluation: one configuration across every fold of a dataset.
//!
//! Per fold: probabilities (one model, or a consensus pack) → position →
//! allowed-hours filter → PnL. A fold whose model call fails, or whose output
//! does not line up with the fold's test rows, is skipped and counted; only
//! configuration errors abort the candidate.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use signalfold_core::consensus::{self, ConsensusError, Member};
use signalfold_core::labels::forward_return_labels;
use signalfold_core::pnl::mean;
use signalfold_core::{
    build_position, CandidateConfig, ConsensusPolicy, Dataset, Direction, Fold, FoldResult,
    LabelParams, PnlSimulator, Position, PositionError, PositionOutcome, ProbabilityOutput,
};

use crate::config::EngineConfig;
use crate::model::ProbabilityModel;

/// Which label vector a candidate is scored against: `None` is the dataset's
/// target column, `Some` the exact bits of relabeling parameters.
pub type LabelKey = Option<(usize, u64)>;

/// One weighted model of a consensus pack.
#[derive(Clone, Copy)]
pub struct PackMember<'m> {
    pub model: &'m dyn ProbabilityModel,
    pub weight: f64,
}

impl std::fmt::Debug for PackMember<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackMember")
            .field("model", &self.model.id())
            .field("weight", &self.weight)
            .finish()
    }
}

/// Aggregated outcome of one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEvaluation {
    pub config: CandidateConfig,
    pub candidate_id: String,
    pub fold_results: Vec<FoldResult>,
    /// Mean fold Sharpe-like ratio; NaN when no fold was scored.
    pub avg_sharpe: f64,
    pub total_trades: usize,
    pub skipped_folds: usize,
}

impl CandidateEvaluation {
    fn from_folds(config: &CandidateConfig, fold_results: Vec<FoldResult>, skipped_folds: usize) -> Self {
        let sharpes: Vec<f64> = fold_results.iter().map(|f| f.sharpe_like_ratio).collect();
        let avg_sharpe = if sharpes.is_empty() {
            f64::NAN
        } else {
            mean(&sharpes)
        };
        Self {
            candidate_id: config.candidate_id(),
            config: config.clone(),
            total_trades: fold_results.iter().map(|f| f.trade_count).sum(),
            avg_sharpe,
            fold_results,
            skipped_folds,
        }
    }
}

// ─── Fold output cache ───────────────────────────────────────────────

/// A model's output for one fold, or its full error chain.
pub type CachedOutput = Result<Arc<ProbabilityOutput>, Arc<anyhow::Error>>;

/// Per-sweep memo of model outputs, keyed by `(model_id, label_key, fold_id)`.
///
/// Each entry is computed at most once; failures are remembered too, so a
/// broken fold is not retried for every sibling candidate.
#[derive(Debug, Default)]
pub struct FoldOutputCache {
    entries: HashMap<(String, LabelKey, usize), CachedOutput>,
    model_calls: usize,
}

impl FoldOutputCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(
        &mut self,
        model: &dyn ProbabilityModel,
        label_key: LabelKey,
        dataset: &Dataset,
        labels: &[Direction],
        fold: &Fold,
    ) -> CachedOutput {
        let key = (model.id().to_string(), label_key, fold.fold_id);
        if let Some(entry) = self.entries.get(&key) {
            return entry.clone();
        }
        self.model_calls += 1;
        let entry = model
            .predict_proba(dataset, labels, fold)
            .map(Arc::new)
            .map_err(Arc::new);
        self.entries.insert(key, entry.clone());
        entry
    }

    /// Number of times a model was actually invoked.
    pub fn model_calls(&self) -> usize {
        self.model_calls
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── Evaluation context ──────────────────────────────────────────────

/// Everything that stays fixed across the candidates of one sweep call:
/// folds, the simulator, feature columns and memoized label vectors.
pub struct EvaluationContext<'d> {
    dataset: &'d Dataset,
    folds: Vec<Fold>,
    simulator: PnlSimulator,
    momentum: Option<Vec<Option<f64>>>,
    hours: Option<Vec<Option<u32>>>,
    target: Option<Arc<Vec<Direction>>>,
    prices: Option<Vec<Option<f64>>>,
    default_labels: Option<LabelParams>,
    relabeled: HashMap<(usize, u64), Arc<Vec<Direction>>>,
    skipped: HashSet<(LabelKey, usize)>,
}

impl<'d> EvaluationContext<'d> {
    pub fn new(dataset: &'d Dataset, config: &EngineConfig) -> Self {
        let folds = match config.split.split(dataset.height()) {
            Ok(iter) => iter.collect(),
            Err(e) => {
                warn!(error = %e, rows = dataset.height(), "dataset cannot be split, no folds evaluated");
                Vec::new()
            }
        };

        let target = dataset.labels(&config.target_column).map(Arc::new);
        if target.is_none() {
            warn!(
                column = %config.target_column,
                "target column missing or entirely null, candidates using it score no folds"
            );
        }

        let simulator = config.simulator();
        let momentum = simulator
            .momentum_gate
            .as_ref()
            .and_then(|gate| dataset.f64_column(&gate.column));
        if let (Some(gate), None) = (&simulator.momentum_gate, &momentum) {
            warn!(column = %gate.column, "momentum column missing, gate passes every row");
        }

        let hours = config
            .hours
            .column
            .as_deref()
            .and_then(|column| dataset.hours(column, config.hours.encoding));
        let filters_hours = config.grid.allowed_hours_list.iter().any(|h| !h.is_empty());
        if filters_hours && hours.is_none() {
            warn!(
                column = ?config.hours.column,
                "hour column missing, allowed_hours passes every row"
            );
        }

        Self {
            dataset,
            folds,
            simulator,
            momentum,
            hours,
            target,
            prices: dataset.f64_column(&config.price_column),
            default_labels: config.labels.default,
            relabeled: HashMap::new(),
            skipped: HashSet::new(),
        }
    }

    pub fn folds(&self) -> &[Fold] {
        &self.folds
    }

    /// Distinct folds skipped so far, per label vector. A fold that fails for
    /// several candidates counts once.
    pub fn skipped_folds(&self) -> usize {
        self.skipped.len()
    }

    fn record_skips(&mut self, label_key: LabelKey, fold_ids: &[usize]) {
        self.skipped.extend(fold_ids.iter().map(|&id| (label_key, id)));
    }

    /// Label vector for a candidate's label parameters, relabeling from the
    /// price column when they differ from the configured default.
    pub fn labels_for(
        &mut self,
        params: Option<LabelParams>,
    ) -> Option<(LabelKey, Arc<Vec<Direction>>)> {
        let params = params.filter(|p| Some(*p) != self.default_labels);
        let Some(params) = params else {
            return self.target.clone().map(|labels| (None, labels));
        };

        let key = params.cache_key();
        if let Some(labels) = self.relabeled.get(&key) {
            return Some((Some(key), Arc::clone(labels)));
        }
        let Some(prices) = self.prices.as_ref() else {
            warn!(
                horizon = params.horizon,
                threshold = params.threshold,
                "price column missing, cannot relabel"
            );
            return None;
        };
        let labels = Arc::new(forward_return_labels(prices, &params));
        debug!(horizon = params.horizon, threshold = params.threshold, "relabeled target");
        self.relabeled.insert(key, Arc::clone(&labels));
        Some((Some(key), labels))
    }

    /// Evaluate a candidate with a single model. The model is asked afresh
    /// for every fold.
    pub fn evaluate_single(
        &mut self,
        model: &dyn ProbabilityModel,
        candidate: &CandidateConfig,
    ) -> Result<CandidateEvaluation, PositionError> {
        let Some((label_key, labels)) = self.labels_for(candidate.label_params) else {
            return Ok(CandidateEvaluation::from_folds(candidate, Vec::new(), 0));
        };

        let mut fold_results = Vec::with_capacity(self.folds.len());
        let mut skipped = Vec::new();
        for fold in &self.folds {
            let output = match model.predict_proba(self.dataset, &labels, fold) {
                Ok(output) => output,
                Err(e) => {
                    let reason = format!("{e:#}");
                    warn!(model = model.id(), fold = fold.fold_id, error = %reason, "model failed, fold skipped");
                    skipped.push(fold.fold_id);
                    continue;
                }
            };
            if !aligned(&output, fold) {
                warn!(model = model.id(), fold = fold.fold_id, "output rows do not match fold, fold skipped");
                skipped.push(fold.fold_id);
                continue;
            }

            let fold_labels = rows_of(&labels, &fold.test_indices);
            let outcome = build_position(
                &output.test_indices,
                &output.class_probs(),
                &fold_labels,
                &candidate.sizing,
                candidate.confidence_sizing(),
            )?;
            fold_results.push(self.score(fold, outcome, candidate, &labels));
        }

        self.record_skips(label_key, &skipped);
        Ok(CandidateEvaluation::from_folds(candidate, fold_results, skipped.len()))
    }

    /// Evaluate a candidate with a consensus pack. Member outputs come from
    /// `cache`, so each `(model, labels, fold)` is computed once per sweep.
    pub fn evaluate_pack(
        &mut self,
        pack: &[PackMember<'_>],
        policy: &ConsensusPolicy,
        candidate: &CandidateConfig,
        cache: &mut FoldOutputCache,
    ) -> Result<CandidateEvaluation, PositionError> {
        let Some((label_key, labels)) = self.labels_for(candidate.label_params) else {
            return Ok(CandidateEvaluation::from_folds(candidate, Vec::new(), 0));
        };

        let mut fold_results = Vec::with_capacity(self.folds.len());
        let mut skipped = Vec::new();
        'folds: for fold in &self.folds {
            let mut outputs = Vec::with_capacity(pack.len());
            for member in pack {
                match cache.get_or_compute(member.model, label_key, self.dataset, &labels, fold) {
                    Ok(output) if aligned(&output, fold) => outputs.push((output, member.weight)),
                    Ok(_) => {
                        warn!(model = member.model.id(), fold = fold.fold_id, "output rows do not match fold, fold skipped");
                        skipped.push(fold.fold_id);
                        continue 'folds;
                    }
                    Err(e) => {
                        let reason = format!("{e:#}");
                        warn!(model = member.model.id(), fold = fold.fold_id, error = %reason, "model failed, fold skipped");
                        skipped.push(fold.fold_id);
                        continue 'folds;
                    }
                }
            }

            let members: Vec<Member<'_>> = outputs
                .iter()
                .map(|(output, weight)| Member {
                    output: output.as_ref(),
                    weight: *weight,
                })
                .collect();
            let fold_labels = rows_of(&labels, &fold.test_indices);
            let outcome = match consensus::combine(
                &members,
                policy,
                &fold_labels,
                &candidate.sizing,
                candidate.confidence_sizing(),
            ) {
                Ok(outcome) => outcome,
                Err(ConsensusError::Position(e)) => return Err(e),
                Err(e) => {
                    warn!(fold = fold.fold_id, error = %e, "consensus failed, fold skipped");
                    skipped.push(fold.fold_id);
                    continue;
                }
            };
            fold_results.push(self.score(fold, outcome, candidate, &labels));
        }

        self.record_skips(label_key, &skipped);
        Ok(CandidateEvaluation::from_folds(candidate, fold_results, skipped.len()))
    }

    /// Hours filter, momentum gate and PnL for one fold's position.
    fn score(
        &self,
        fold: &Fold,
        outcome: PositionOutcome,
        candidate: &CandidateConfig,
        labels: &[Direction],
    ) -> FoldResult {
        let mut position: Position = outcome.position;
        if let (Some(allowed), Some(hours)) = (&candidate.allowed_hours, &self.hours) {
            let zeroed = position.retain_rows(|row| match hours.get(row).copied().flatten() {
                Some(hour) => allowed.contains(&hour),
                None => true,
            });
            debug!(fold = fold.fold_id, zeroed, "allowed-hours filter applied");
        }
        let pnl = self
            .simulator
            .simulate(&position, labels, self.momentum.as_deref());
        if pnl.gated > 0 {
            debug!(fold = fold.fold_id, gated = pnl.gated, "momentum gate zeroed positions");
        }
        FoldResult::from_pnl(fold.fold_id, outcome.threshold_used, &pnl)
    }
}

fn aligned(output: &ProbabilityOutput, fold: &Fold) -> bool {
    output.test_indices == fold.test_indices && output.probabilities.len() == fold.test_indices.len()
}

fn rows_of(labels: &[Direction], rows: &[usize]) -> Vec<Direction> {
    rows.iter()
        .map(|&row| labels.get(row).copied().unwrap_or(Direction::Flat))
        .collect()
}
