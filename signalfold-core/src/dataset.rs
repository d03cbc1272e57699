//! Tabular input: an indicator-enriched polars `DataFrame` with named columns.
//!
//! The engine only reads from it: target labels, numeric features (momentum,
//! prices, precomputed probabilities) and hour-of-day. Lookups that cannot be
//! satisfied return `None` so callers can fail soft on a bad dataset slice.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Timelike};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Direction;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parquet error: {0}")]
    Parquet(String),
}

/// How an hour column is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HourEncoding {
    /// Integer hour of day, 0..=23.
    #[default]
    Hour,
    /// Epoch milliseconds; the hour is taken in UTC.
    EpochMillis,
}

/// Read-only tabular dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
}

impl Dataset {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    /// Load a Parquet file.
    pub fn read_parquet(path: &Path) -> Result<Self, DatasetError> {
        let file = fs::File::open(path)?;
        let frame = ParquetReader::new(file)
            .finish()
            .map_err(|e| DatasetError::Parquet(format!("read {}: {e}", path.display())))?;
        Ok(Self { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    /// Directional labels from `name`.
    ///
    /// `None` when the column is missing or entirely null. String cells parse
    /// with [`Direction::from_label`], numeric cells by sign, nulls are Flat.
    pub fn labels(&self, name: &str) -> Option<Vec<Direction>> {
        let column = self.frame.column(name).ok()?;
        if column.null_count() == column.len() {
            return None;
        }
        let labels: Vec<Direction> = match column.dtype() {
            DataType::String => column
                .str()
                .ok()?
                .iter()
                .map(|v| v.map_or(Direction::Flat, Direction::from_label))
                .collect(),
            _ => column
                .cast(&DataType::Float64)
                .ok()?
                .f64()
                .ok()?
                .iter()
                .map(|v| v.map_or(Direction::Flat, Direction::from_value))
                .collect(),
        };
        Some(labels)
    }

    /// Numeric column cast to f64. NaN cells read as missing.
    pub fn f64_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let column = self.frame.column(name).ok()?;
        let cast = column.cast(&DataType::Float64).ok()?;
        let values = cast
            .f64()
            .ok()?
            .iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        Some(values)
    }

    /// Hour of day per row. Out-of-range or unparseable cells read as missing.
    pub fn hours(&self, name: &str, encoding: HourEncoding) -> Option<Vec<Option<u32>>> {
        let column = self.frame.column(name).ok()?;
        let cast = column.cast(&DataType::Int64).ok()?;
        let values = cast
            .i64()
            .ok()?
            .iter()
            .map(|v| v.and_then(|raw| decode_hour(raw, encoding)))
            .collect();
        Some(values)
    }
}

fn decode_hour(raw: i64, encoding: HourEncoding) -> Option<u32> {
    match encoding {
        HourEncoding::Hour => u32::try_from(raw).ok().filter(|h| *h < 24),
        HourEncoding::EpochMillis => DateTime::from_timestamp_millis(raw).map(|dt| dt.hour()),
    }
}
