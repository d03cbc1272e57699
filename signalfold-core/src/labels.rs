//! Directional targets derived from forward returns.

use crate::domain::Direction;
use crate::sizing::LabelParams;

/// Label each row from `price[i + horizon] / price[i] - 1`.
///
/// Up above `threshold`, Down below `-threshold`, Flat otherwise. Rows whose
/// forward price is unavailable (end of data, missing or non-positive base
/// price) are Flat.
pub fn forward_return_labels(prices: &[Option<f64>], params: &LabelParams) -> Vec<Direction> {
    let horizon = params.horizon.max(1);
    (0..prices.len())
        .map(|i| {
            let base = prices[i].filter(|p| *p > 0.0);
            let ahead = prices.get(i + horizon).copied().flatten();
            match (base, ahead) {
                (Some(p0), Some(p1)) => {
                    let ret = p1 / p0 - 1.0;
                    if ret > params.threshold {
                        Direction::Up
                    } else if ret < -params.threshold {
                        Direction::Down
                    } else {
                        Direction::Flat
                    }
                }
                _ => Direction::Flat,
            }
        })
        .collect()
}
