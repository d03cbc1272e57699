//! Multi-symbol batches: one sweep per symbol, bad symbols skipped.
//!
//! A symbol whose data failed to load, or whose sweep fails, is recorded with
//! its reason and counted in `skipped`. Errors that would fail identically
//! for every symbol (see [`SweepError::is_preflight`]) abort the batch.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use signalfold_core::{Dataset, DatasetError};

use crate::sweep::{SweepError, SweepResult};

/// One symbol's dataset, or the reason it could not be loaded.
#[derive(Debug)]
pub struct SymbolInput {
    pub symbol: String,
    pub dataset: Result<Dataset, DatasetError>,
}

impl SymbolInput {
    pub fn new(symbol: impl Into<String>, dataset: Dataset) -> Self {
        Self {
            symbol: symbol.into(),
            dataset: Ok(dataset),
        }
    }

    pub fn from_parquet(symbol: impl Into<String>, path: &Path) -> Self {
        Self {
            symbol: symbol.into(),
            dataset: Dataset::read_parquet(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolResult {
    pub symbol: String,
    pub result: SweepResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<SymbolResult>,
    pub failures: Vec<SymbolFailure>,
    pub skipped: usize,
}

/// Run `sweep_one` for every input in order.
///
/// ```ignore
/// let report = run_batch(inputs, |ds| orchestrator.sweep(ds, &model))?;
/// ```
pub fn run_batch<I, F>(inputs: I, mut sweep_one: F) -> Result<BatchReport, SweepError>
where
    I: IntoIterator<Item = SymbolInput>,
    F: FnMut(&Dataset) -> Result<SweepResult, SweepError>,
{
    let mut report = BatchReport::default();

    for input in inputs {
        let outcome = match &input.dataset {
            Ok(dataset) => sweep_one(dataset),
            Err(e) => {
                skip(&mut report, input.symbol, e.to_string());
                continue;
            }
        };
        match outcome {
            Ok(result) => {
                info!(
                    symbol = %input.symbol,
                    avg_sharpe = result.aggregate_metrics.avg_sharpe,
                    "symbol swept"
                );
                report.results.push(SymbolResult {
                    symbol: input.symbol,
                    result,
                });
            }
            Err(e) if e.is_preflight() => return Err(e),
            Err(e) => skip(&mut report, input.symbol, e.to_string()),
        }
    }

    info!(
        swept = report.results.len(),
        skipped = report.skipped,
        "batch finished"
    );
    Ok(report)
}

fn skip(report: &mut BatchReport, symbol: String, reason: String) {
    warn!(symbol = %symbol, reason = %reason, "symbol skipped");
    report.skipped += 1;
    report.failures.push(SymbolFailure { symbol, reason });
}
