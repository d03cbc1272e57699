//! Probability-to-position conversion.
//!
//! Two mutually exclusive modes (see [`SizingMode`]):
//! - **Threshold**: for each candidate threshold `t`, go long where
//!   `p_up >= t && p_up > p_down`, short where the mirror holds, flat
//!   otherwise. Each threshold is scored by directional accuracy against the
//!   labels of the rows being positioned and the best one is kept.
//! - **Top percentile**: rank rows by `max(p_up, p_down)` and trade the top
//!   `max(1, floor(top_pct * n))`, signed by the larger side (ties go long).
//!
//! NOTE: threshold selection sees the labels of the same fold it is then
//! scored on, so threshold-mode results carry look-ahead.

use thiserror::Error;

use crate::domain::{ClassProbs, Direction, Position};
use crate::sizing::{ConfidenceSizing, SizingMode};

/// Errors from position construction.
#[derive(Debug, Error, PartialEq)]
pub enum PositionError {
    #[error("threshold mode needs at least one threshold")]
    EmptyThresholds,
    #[error("top_pct must be a positive number, got {0}")]
    InvalidTopPct(f64),
    #[error("length mismatch: {indices} indices, {probs} probability rows, {labels} labels")]
    LengthMismatch {
        indices: usize,
        probs: usize,
        labels: usize,
    },
}

/// A fold's position vector plus the threshold that produced it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionOutcome {
    pub position: Position,
    pub threshold_used: Option<f64>,
}

// ─── Threshold mode ──────────────────────────────────────────────────

/// Unsized signs for a single threshold.
pub fn threshold_signs(probs: &ClassProbs, threshold: f64) -> Vec<f64> {
    probs
        .p_up
        .iter()
        .zip(&probs.p_down)
        .map(|(&up, &down)| {
            if up >= threshold && up > down {
                1.0
            } else if down >= threshold && down > up {
                -1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Share of nonzero signs that match the label direction. 0 when nothing trades.
pub fn directional_accuracy(signs: &[f64], labels: &[Direction]) -> f64 {
    let mut active = 0usize;
    let mut correct = 0usize;
    for (&s, label) in signs.iter().zip(labels) {
        if s == 0.0 {
            continue;
        }
        active += 1;
        if s == label.sign() {
            correct += 1;
        }
    }
    if active == 0 {
        0.0
    } else {
        correct as f64 / active as f64
    }
}

/// Pick the threshold with the best directional accuracy.
///
/// Ties go to the higher threshold: with equal accuracy the stricter filter
/// is preferred.
pub fn select_threshold(
    probs: &ClassProbs,
    labels: &[Direction],
    thresholds: &[f64],
) -> Option<(f64, Vec<f64>)> {
    let mut best: Option<(f64, f64, Vec<f64>)> = None;
    for &t in thresholds {
        let signs = threshold_signs(probs, t);
        let score = directional_accuracy(&signs, labels);
        let better = match &best {
            None => true,
            Some((best_t, best_score, _)) => {
                score > *best_score || (score == *best_score && t > *best_t)
            }
        };
        if better {
            best = Some((t, score, signs));
        }
    }
    best.map(|(t, _, signs)| (t, signs))
}

// ─── Top-percentile mode ─────────────────────────────────────────────

/// Number of rows traded in top-percentile mode.
pub fn top_k(top_pct: f64, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    ((top_pct * n as f64).floor() as usize).clamp(1, n)
}

/// Unsized signs for the `top_pct` most confident rows.
pub fn top_percentile_signs(probs: &ClassProbs, top_pct: f64) -> Vec<f64> {
    let n = probs.len();
    let confidence: Vec<f64> = (0..n)
        .map(|i| {
            let c = probs.max_prob(i);
            if c.is_nan() {
                f64::NEG_INFINITY
            } else {
                c
            }
        })
        .collect();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| confidence[b].total_cmp(&confidence[a]));

    let mut signs = vec![0.0; n];
    for &i in order.iter().take(top_k(top_pct, n)) {
        signs[i] = if probs.p_up[i] >= probs.p_down[i] {
            1.0
        } else {
            -1.0
        };
    }
    signs
}

// ─── Builder ─────────────────────────────────────────────────────────

fn apply_sizing(signs: &mut [f64], probs: &ClassProbs, sizing: ConfidenceSizing) {
    if !sizing.enabled {
        return;
    }
    for (i, s) in signs.iter_mut().enumerate() {
        if *s != 0.0 {
            *s *= sizing.size(probs.max_prob(i));
        }
    }
}

/// Turn one fold's class probabilities into a position vector.
///
/// `indices`, `probs` and `labels` are aligned row-for-row.
pub fn build_position(
    indices: &[usize],
    probs: &ClassProbs,
    labels: &[Direction],
    mode: &SizingMode,
    sizing: ConfidenceSizing,
) -> Result<PositionOutcome, PositionError> {
    let n = indices.len();
    if probs.p_up.len() != n || probs.p_down.len() != n || labels.len() != n {
        return Err(PositionError::LengthMismatch {
            indices: indices.len(),
            probs: probs.len(),
            labels: labels.len(),
        });
    }

    let (mut signs, threshold_used) = match mode {
        SizingMode::Threshold(thresholds) => {
            let (t, signs) = select_threshold(probs, labels, thresholds)
                .ok_or(PositionError::EmptyThresholds)?;
            (signs, Some(t))
        }
        SizingMode::TopPercentile(top_pct) => {
            if !top_pct.is_finite() || *top_pct <= 0.0 {
                return Err(PositionError::InvalidTopPct(*top_pct));
            }
            (top_percentile_signs(probs, *top_pct), None)
        }
    };
    apply_sizing(&mut signs, probs, sizing);

    Ok(PositionOutcome {
        position: Position::new(indices.to_vec(), signs),
        threshold_used,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probs(p_up: &[f64], p_down: &[f64]) -> ClassProbs {
        ClassProbs {
            p_up: p_up.to_vec(),
            p_down: p_down.to_vec(),
        }
    }

    #[test]
    fn threshold_signs_respect_both_conditions() {
        let p = probs(&[0.7, 0.2, 0.5, 0.55], &[0.2, 0.7, 0.5, 0.45]);
        assert_eq!(threshold_signs(&p, 0.6), vec![1.0, -1.0, 0.0, 0.0]);
        assert_eq!(threshold_signs(&p, 0.5), vec![1.0, -1.0, 0.0, 1.0]);
    }

    #[test]
    fn selects_most_accurate_threshold() {
        // Low threshold admits a wrong trade on row 1.
        let p = probs(&[0.9, 0.55, 0.1], &[0.1, 0.45, 0.9]);
        let labels = [Direction::Up, Direction::Down, Direction::Down];
        let (t, signs) = select_threshold(&p, &labels, &[0.5, 0.8]).unwrap();
        assert_eq!(t, 0.8);
        assert_eq!(signs, vec![1.0, 0.0, -1.0]);
    }

    #[test]
    fn ties_prefer_higher_threshold() {
        let p = probs(&[0.9, 0.9], &[0.1, 0.1]);
        let labels = [Direction::Up, Direction::Down];
        let (t, _) = select_threshold(&p, &labels, &[0.5, 0.9, 0.7]).unwrap();
        assert_eq!(t, 0.9);
    }

    #[test]
    fn empty_thresholds_is_an_error() {
        let p = probs(&[0.9], &[0.1]);
        let err = build_position(
            &[0],
            &p,
            &[Direction::Up],
            &SizingMode::Threshold(vec![]),
            ConfidenceSizing::default(),
        )
        .unwrap_err();
        assert_eq!(err, PositionError::EmptyThresholds);
    }

    #[test]
    fn top_k_is_at_least_one() {
        assert_eq!(top_k(0.001, 10), 1);
        assert_eq!(top_k(0.25, 10), 2);
        assert_eq!(top_k(1.0, 10), 10);
        assert_eq!(top_k(3.0, 10), 10);
        assert_eq!(top_k(0.5, 0), 0);
    }

    #[test]
    fn top_percentile_picks_most_confident() {
        let p = probs(&[0.6, 0.1, 0.95, 0.5], &[0.4, 0.9, 0.05, 0.5]);
        let signs = top_percentile_signs(&p, 0.5);
        assert_eq!(signs, vec![0.0, -1.0, 1.0, 0.0]);
    }

    #[test]
    fn identical_probabilities_default_long() {
        let p = probs(&[0.5; 4], &[0.5; 4]);
        let signs = top_percentile_signs(&p, 1.0);
        assert_eq!(signs, vec![1.0; 4]);
    }

    #[test]
    fn confidence_sizing_scales_and_caps() {
        let p = probs(&[0.9, 0.6], &[0.1, 0.4]);
        let outcome = build_position(
            &[5, 6],
            &p,
            &[Direction::Up, Direction::Up],
            &SizingMode::Threshold(vec![0.55]),
            ConfidenceSizing {
                enabled: true,
                cap: 0.5,
            },
        )
        .unwrap();
        assert_eq!(outcome.threshold_used, Some(0.55));
        assert_eq!(outcome.position.indices, vec![5, 6]);
        assert_eq!(outcome.position.values[0], 0.5);
        assert!((outcome.position.values[1] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn top_percentile_has_no_threshold() {
        let p = probs(&[0.8, 0.3], &[0.2, 0.7]);
        let outcome = build_position(
            &[0, 1],
            &p,
            &[Direction::Up, Direction::Down],
            &SizingMode::TopPercentile(0.5),
            ConfidenceSizing::default(),
        )
        .unwrap();
        assert_eq!(outcome.threshold_used, None);
        assert_eq!(outcome.position.trade_count(), 1);
    }

    #[test]
    fn rejects_non_positive_top_pct() {
        let p = probs(&[0.8], &[0.2]);
        let err = build_position(
            &[0],
            &p,
            &[Direction::Up],
            &SizingMode::TopPercentile(0.0),
            ConfidenceSizing::default(),
        )
        .unwrap_err();
        assert_eq!(err, PositionError::InvalidTopPct(0.0));
    }

    #[test]
    fn rejects_misaligned_inputs() {
        let p = probs(&[0.8, 0.1], &[0.2, 0.9]);
        let err = build_position(
            &[0],
            &p,
            &[Direction::Up],
            &SizingMode::TopPercentile(0.5),
            ConfidenceSizing::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PositionError::LengthMismatch { .. }));
    }
}
