//! Ground-truth directional labels.

use serde::{Deserialize, Serialize};

/// Directional outcome of a row: the target the classifier predicts and the
/// label the PnL simulator scores against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    /// Parse a textual label. Case-insensitive; anything unrecognized is `Flat`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "up" | "buy" | "long" | "1" | "+1" => Direction::Up,
            "down" | "sell" | "short" | "-1" => Direction::Down,
            _ => Direction::Flat,
        }
    }

    /// Map a numeric label by its sign. NaN and zero are `Flat`.
    pub fn from_value(value: f64) -> Self {
        if value > 0.0 {
            Direction::Up
        } else if value < 0.0 {
            Direction::Down
        } else {
            Direction::Flat
        }
    }

    /// +1 for Up, -1 for Down, 0 otherwise.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
            Direction::Flat => 0.0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Flat => "FLAT",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_spellings() {
        assert_eq!(Direction::from_label("UP"), Direction::Up);
        assert_eq!(Direction::from_label(" down "), Direction::Down);
        assert_eq!(Direction::from_label("Sell"), Direction::Down);
        assert_eq!(Direction::from_label("1"), Direction::Up);
        assert_eq!(Direction::from_label("FLAT"), Direction::Flat);
        assert_eq!(Direction::from_label("sideways"), Direction::Flat);
    }

    #[test]
    fn numeric_labels_map_by_sign() {
        assert_eq!(Direction::from_value(2.0), Direction::Up);
        assert_eq!(Direction::from_value(-0.1), Direction::Down);
        assert_eq!(Direction::from_value(0.0), Direction::Flat);
        assert_eq!(Direction::from_value(f64::NAN), Direction::Flat);
    }

    #[test]
    fn sign_values() {
        assert_eq!(Direction::Up.sign(), 1.0);
        assert_eq!(Direction::Down.sign(), -1.0);
        assert_eq!(Direction::Flat.sign(), 0.0);
    }
}
