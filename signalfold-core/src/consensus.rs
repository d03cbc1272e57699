//! Multi-model consensus: several models' fold outputs in, one position out.
//!
//! Policies form a closed set:
//! - `Weighted`: weighted mean of each member's `p_up` / `p_down`, then the
//!   ordinary single-model position builder.
//! - `Majority`: per-member signs (gated by `min_score`) summed with weights;
//!   trade `sign(vote_sum)` when `|vote_sum| >= min_quorum`.
//! - `All`: trade only when every weighted member votes the same nonzero sign.
//!
//! Non-positive weights are clamped to 0. When no member keeps a positive
//! weight, voting falls back to one vote per member.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ClassProbs, Direction, Position, ProbabilityOutput};
use crate::positions::{build_position, PositionError, PositionOutcome};
use crate::sizing::{ConfidenceSizing, SizingMode};

// ─── Policy ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    Weighted,
    Majority,
    All,
}

/// Declared outcome for deadlocked votes. Carried in configuration and
/// reports; the vote arithmetic does not consult it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreaker {
    #[default]
    Hold,
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusPolicy {
    pub policy: PolicyKind,
    /// Minimum `|vote_sum|` for `Majority`. `None` = half the total weight.
    pub min_quorum: Option<f64>,
    /// Per-member confidence floor: a member abstains on rows where
    /// `max(p_up, p_down) < min_score`.
    pub min_score: f64,
    pub tie_breaker: TieBreaker,
}

impl Default for ConsensusPolicy {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Weighted,
            min_quorum: None,
            min_score: 0.0,
            tie_breaker: TieBreaker::Hold,
        }
    }
}

/// One model's contribution to a fold.
#[derive(Debug, Clone, Copy)]
pub struct Member<'a> {
    pub output: &'a ProbabilityOutput,
    pub weight: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConsensusError {
    #[error("consensus needs at least one member")]
    NoMembers,
    #[error("member {member} covers different test rows than member 0")]
    Misaligned { member: usize },
    #[error(transparent)]
    Position(#[from] PositionError),
}

// ─── Combination ─────────────────────────────────────────────────────

/// Combine member outputs for one fold into a position.
///
/// `labels` are aligned to the fold's test rows; only the weighted policy in
/// threshold mode looks at them.
pub fn combine(
    members: &[Member<'_>],
    policy: &ConsensusPolicy,
    labels: &[Direction],
    mode: &SizingMode,
    sizing: ConfidenceSizing,
) -> Result<PositionOutcome, ConsensusError> {
    let first = members.first().ok_or(ConsensusError::NoMembers)?;
    if let Some(member) = members
        .iter()
        .position(|m| m.output.test_indices != first.output.test_indices)
    {
        return Err(ConsensusError::Misaligned { member });
    }
    let indices = &first.output.test_indices;

    match policy.policy {
        PolicyKind::Weighted => {
            let probs = weighted_probs(members);
            Ok(build_position(indices, &probs, labels, mode, sizing)?)
        }
        PolicyKind::Majority => Ok(vote(members, policy, sizing, majority_sign)),
        PolicyKind::All => Ok(vote(members, policy, sizing, unanimous_sign)),
    }
}

fn clamped_weights(members: &[Member<'_>]) -> Vec<f64> {
    members.iter().map(|m| m.weight.max(0.0)).collect()
}

/// Weighted mean of the members' up/down columns.
pub fn weighted_probs(members: &[Member<'_>]) -> ClassProbs {
    let weights = clamped_weights(members);
    let total: f64 = weights.iter().sum();
    let denom = if total > 0.0 { total } else { 1.0 };
    let n = members.first().map_or(0, |m| m.output.len());

    let mut p_up = vec![0.0; n];
    let mut p_down = vec![0.0; n];
    for (member, w) in members.iter().zip(&weights) {
        let probs = member.output.class_probs();
        for i in 0..n {
            p_up[i] += w * probs.p_up[i];
            p_down[i] += w * probs.p_down[i];
        }
    }
    for i in 0..n {
        p_up[i] /= denom;
        p_down[i] /= denom;
    }
    ClassProbs { p_up, p_down }
}

/// One member's vote on each row: `sign(p_up - p_down)`, or 0 below `min_score`.
pub fn member_votes(probs: &ClassProbs, min_score: f64) -> Vec<f64> {
    (0..probs.len())
        .map(|i| {
            if probs.max_prob(i) < min_score {
                return 0.0;
            }
            let diff = probs.p_up[i] - probs.p_down[i];
            if diff > 0.0 {
                1.0
            } else if diff < 0.0 {
                -1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Row-level tally handed to the sign rule.
struct Tally<'a> {
    vote_sum: f64,
    total_weight: f64,
    quorum: f64,
    /// `(weight, vote)` of each member on this row.
    ballots: &'a [(f64, f64)],
}

fn majority_sign(t: &Tally<'_>) -> f64 {
    if t.vote_sum != 0.0 && t.vote_sum.abs() >= t.quorum {
        t.vote_sum.signum()
    } else {
        0.0
    }
}

fn unanimous_sign(t: &Tally<'_>) -> f64 {
    let mut agreed = 0.0;
    for &(weight, vote) in t.ballots {
        if weight <= 0.0 {
            continue;
        }
        if vote == 0.0 || (agreed != 0.0 && vote != agreed) {
            return 0.0;
        }
        agreed = vote;
    }
    agreed
}

fn vote<F>(
    members: &[Member<'_>],
    policy: &ConsensusPolicy,
    sizing: ConfidenceSizing,
    rule: F,
) -> PositionOutcome
where
    F: Fn(&Tally<'_>) -> f64,
{
    let mut weights = clamped_weights(members);
    if weights.iter().sum::<f64>() <= 0.0 {
        weights = vec![1.0; members.len()];
    }
    let total_weight: f64 = weights.iter().sum();
    let quorum = policy.min_quorum.unwrap_or(total_weight / 2.0);

    let votes: Vec<Vec<f64>> = members
        .iter()
        .map(|m| member_votes(&m.output.class_probs(), policy.min_score))
        .collect();

    let indices = members[0].output.test_indices.clone();
    let mut ballots = Vec::with_capacity(members.len());
    let values = (0..indices.len())
        .map(|i| {
            ballots.clear();
            ballots.extend(weights.iter().zip(&votes).map(|(w, v)| (*w, v[i])));
            let vote_sum: f64 = ballots.iter().map(|(w, v)| w * v).sum();
            let sign = rule(&Tally {
                vote_sum,
                total_weight,
                quorum,
                ballots: &ballots,
            });
            if sign == 0.0 {
                return 0.0;
            }
            if sizing.enabled {
                sign * (vote_sum.abs() / total_weight).min(sizing.cap)
            } else {
                sign
            }
        })
        .collect();

    PositionOutcome {
        position: Position::new(indices, values),
        threshold_used: None,
    }
}
