//! Candidate configurations. Each one is a single point of the sweep grid.
//!
//! Threshold search and top-percentile selection are mutually exclusive, so
//! they live in one sum type instead of two optional fields.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// How a fold's probabilities are turned into signs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SizingMode {
    /// Try each threshold, keep the best-scoring one per fold.
    Threshold(Vec<f64>),
    /// Trade the most confident `top_pct` share of rows.
    TopPercentile(f64),
}

impl Default for SizingMode {
    fn default() -> Self {
        SizingMode::Threshold(vec![0.5])
    }
}

impl std::fmt::Display for SizingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizingMode::Threshold(ts) => {
                let list: Vec<String> = ts.iter().map(|t| format!("{t}")).collect();
                write!(f, "thresholds=[{}]", list.join(","))
            }
            SizingMode::TopPercentile(p) => write!(f, "top_pct={p}"),
        }
    }
}

/// Confidence-based sizing: scale nonzero entries by `min(confidence, cap)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSizing {
    pub enabled: bool,
    pub cap: f64,
}

impl Default for ConfidenceSizing {
    fn default() -> Self {
        Self {
            enabled: false,
            cap: 1.0,
        }
    }
}

impl ConfidenceSizing {
    /// Size for a row whose winning-class probability is `max_prob`.
    ///
    /// Confidence is rescaled to `[0, 1]` via `max(0, 2p - 1)`.
    pub fn size(&self, max_prob: f64) -> f64 {
        if !self.enabled {
            return 1.0;
        }
        let confidence = (2.0 * max_prob - 1.0).max(0.0);
        confidence.min(self.cap)
    }
}

/// Parameters for re-deriving directional labels from forward returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelParams {
    /// Rows ahead used for the forward return.
    pub horizon: usize,
    /// Minimum absolute forward return to count as Up/Down.
    pub threshold: f64,
}

impl Default for LabelParams {
    fn default() -> Self {
        Self {
            horizon: 1,
            threshold: 0.0,
        }
    }
}

impl LabelParams {
    /// Exact-value key for memoizing relabeled vectors.
    pub fn cache_key(&self) -> (usize, u64) {
        (self.horizon, self.threshold.to_bits())
    }
}

/// One immutable point of the sweep grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateConfig {
    pub sizing: SizingMode,
    /// Hours of day (0..=23) in which positions may be held. `None` = any.
    pub allowed_hours: Option<BTreeSet<u32>>,
    /// `None` = use the dataset's target column as-is.
    pub label_params: Option<LabelParams>,
    pub size_by_conf: bool,
    pub conf_cap: f64,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            sizing: SizingMode::default(),
            allowed_hours: None,
            label_params: None,
            size_by_conf: false,
            conf_cap: 1.0,
        }
    }
}

impl CandidateConfig {
    pub fn confidence_sizing(&self) -> ConfidenceSizing {
        ConfidenceSizing {
            enabled: self.size_by_conf,
            cap: self.conf_cap,
        }
    }

    /// Deterministic identity: blake3 of the canonical JSON encoding.
    pub fn candidate_id(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().as_str()[..16].to_string()
    }

    /// Short human-readable description for logs and summaries.
    pub fn describe(&self) -> String {
        let hours = match &self.allowed_hours {
            Some(set) => {
                let list: Vec<String> = set.iter().map(u32::to_string).collect();
                format!("[{}]", list.join(","))
            }
            None => "any".to_string(),
        };
        let labels = match &self.label_params {
            Some(p) => format!("horizon={} threshold={}", p.horizon, p.threshold),
            None => "default".to_string(),
        };
        let sizing = if self.size_by_conf {
            format!("conf(cap={})", self.conf_cap)
        } else {
            "unit".to_string()
        };
        format!("{} hours={hours} labels=({labels}) size={sizing}", self.sizing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_rescales_and_caps() {
        let sizing = ConfidenceSizing {
            enabled: true,
            cap: 0.5,
        };
        assert_eq!(sizing.size(0.5), 0.0);
        assert!((sizing.size(0.6) - 0.2).abs() < 1e-12);
        assert_eq!(sizing.size(0.95), 0.5);
        assert_eq!(sizing.size(0.3), 0.0);
    }

    #[test]
    fn disabled_sizing_is_unit() {
        assert_eq!(ConfidenceSizing::default().size(0.51), 1.0);
    }

    #[test]
    fn candidate_id_is_deterministic() {
        let a = CandidateConfig {
            sizing: SizingMode::TopPercentile(0.2),
            conf_cap: 1.0,
            ..Default::default()
        };
        let b = a.clone();
        assert_eq!(a.candidate_id(), b.candidate_id());
        assert_eq!(a.candidate_id().len(), 16);
    }

    #[test]
    fn candidate_id_changes_with_params() {
        let a = CandidateConfig {
            sizing: SizingMode::Threshold(vec![0.55]),
            conf_cap: 1.0,
            ..Default::default()
        };
        let mut b = a.clone();
        b.size_by_conf = true;
        assert_ne!(a.candidate_id(), b.candidate_id());
    }

    #[test]
    fn describe_mentions_each_axis() {
        let c = CandidateConfig {
            sizing: SizingMode::Threshold(vec![0.5, 0.6]),
            allowed_hours: Some([9, 10].into_iter().collect()),
            label_params: Some(LabelParams {
                horizon: 3,
                threshold: 0.001,
            }),
            size_by_conf: true,
            conf_cap: 0.8,
        };
        let text = c.describe();
        assert!(text.contains("thresholds=[0.5,0.6]"));
        assert!(text.contains("hours=[9,10]"));
        assert!(text.contains("horizon=3"));
        assert!(text.contains("conf(cap=0.8)"));
    }
}
