//! Config files on disk and multi-symbol batches over Parquet inputs.

use std::fs;
use std::path::Path;

use polars::prelude::*;
use signalfold_core::{PolicyKind, SizingMode};
use signalfold_runner::{
    run_batch, ColumnModel, ConfigError, EngineConfig, PackMember, PriorModel, SweepError,
    SweepOrchestrator, SymbolInput,
};

// ── Helpers ──

const CONFIG: &str = r#"
target_column = "label"

[split]
n_splits = 4
embargo_fraction = 0.05

[costs]
slippage_bps = 1.0

[consensus]
policy = "weighted"

[grid]
top_pct_list = [0.25, 0.5, 1.0]

[guardrails]
max_combos = 10
min_trades = 4
"#;

fn write_parquet(path: &Path, mut frame: DataFrame) {
    let file = fs::File::create(path).unwrap();
    ParquetWriter::new(file).finish(&mut frame).unwrap();
}

/// Rows where the up column is right on 3 of every 4 rows.
fn trending_frame(n: usize) -> DataFrame {
    let label: Vec<&str> = (0..n).map(|i| if i % 4 == 3 { "DOWN" } else { "UP" }).collect();
    let p_up: Vec<f64> = (0..n).map(|i| 0.55 + 0.4 * ((i % 5) as f64 / 5.0)).collect();
    let p_down: Vec<f64> = p_up.iter().map(|p| 1.0 - p).collect();
    df!("label" => label, "p_up" => p_up, "p_down" => p_down).unwrap()
}

// ── Configuration ──

#[test]
fn bdd_scenario_config_file_drives_a_sweep() {
    // GIVEN a config file on disk
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    fs::write(&path, CONFIG).unwrap();

    // WHEN it is loaded and used for a sweep
    let config = EngineConfig::from_file(&path).unwrap();
    assert_eq!(config.split.n_splits, 4);
    assert_eq!(config.consensus.policy, PolicyKind::Weighted);
    assert_eq!(config.grid.combination_count(), 3);

    let orchestrator = SweepOrchestrator::new(config).unwrap();
    let dataset = signalfold_core::Dataset::new(trending_frame(80));
    let result = orchestrator
        .sweep(&dataset, &ColumnModel::new("cols", "p_up", "p_down"))
        .unwrap();

    // THEN a top-percentile candidate is selected over 4 folds
    assert!(matches!(result.best_config.sizing, SizingMode::TopPercentile(_)));
    assert_eq!(result.fold_results.len(), 4);
    assert_eq!(result.candidates_evaluated, 3);
    assert!(result.fold_results.iter().all(|f| f.threshold_used.is_none()));

    // AND the result round-trips through JSON for persistence
    let json = serde_json::to_string(&result).unwrap();
    let back: signalfold_runner::SweepResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.best_config, result.best_config);
    assert_eq!(back.best_candidate_id, result.best_candidate_id);
    assert_eq!(back.fold_results.len(), result.fold_results.len());
}

#[test]
fn bdd_scenario_conflicting_sizing_axes_in_file_rejected() {
    // GIVEN a config giving both thresholds and top percentiles
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[grid]\nthresholds_list = [[0.5]]\ntop_pct_list = [0.2]\n").unwrap();

    // WHEN it is loaded
    let err = EngineConfig::from_file(&path).unwrap_err();

    // THEN the conflict is reported as a grid error
    assert!(matches!(err, ConfigError::Grid(_)));
}

// ── Batches ──

#[test]
fn bdd_scenario_batch_skips_bad_symbols() {
    // GIVEN two good files, one file without labels and one missing path
    let dir = tempfile::tempdir().unwrap();
    let good_a = dir.path().join("aaa.parquet");
    let good_b = dir.path().join("bbb.parquet");
    let broken = dir.path().join("zzz.parquet");
    write_parquet(&good_a, trending_frame(80));
    write_parquet(&good_b, trending_frame(120));
    write_parquet(&broken, df!("p_up" => vec![0.9; 40], "p_down" => vec![0.1; 40]).unwrap());

    let orchestrator = SweepOrchestrator::new(EngineConfig::from_toml(CONFIG).unwrap()).unwrap();
    let model = ColumnModel::new("cols", "p_up", "p_down");
    let inputs = vec![
        SymbolInput::from_parquet("AAA", &good_a),
        SymbolInput::from_parquet("ZZZ", &broken),
        SymbolInput::from_parquet("MISSING", &dir.path().join("missing.parquet")),
        SymbolInput::from_parquet("BBB", &good_b),
    ];

    // WHEN the batch runs
    let report = run_batch(inputs, |dataset| orchestrator.sweep(dataset, &model)).unwrap();

    // THEN the good symbols are swept and the others skipped with reasons
    let swept: Vec<&str> = report.results.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(swept, vec!["AAA", "BBB"]);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.failures[0].symbol, "ZZZ");
    assert!(report.failures[0].reason.contains("guardrails"));
    assert_eq!(report.failures[1].symbol, "MISSING");
}

#[test]
fn bdd_scenario_batch_aborts_on_oversized_grid() {
    // GIVEN a grid larger than max_combos
    let mut config = EngineConfig::from_toml(CONFIG).unwrap();
    config.guardrails.max_combos = 2;
    let orchestrator = SweepOrchestrator::new(config).unwrap();
    let prior = PriorModel::new("prior");
    let cols = ColumnModel::new("cols", "p_up", "p_down");
    let pack = [
        PackMember {
            model: &prior,
            weight: 1.0,
        },
        PackMember {
            model: &cols,
            weight: 1.0,
        },
    ];
    let inputs = vec![
        SymbolInput::new("AAA", signalfold_core::Dataset::new(trending_frame(40))),
        SymbolInput::new("BBB", signalfold_core::Dataset::new(trending_frame(40))),
    ];

    // WHEN the batch runs
    let err = run_batch(inputs, |dataset| orchestrator.sweep_pack(dataset, &pack)).unwrap_err();

    // THEN the whole batch fails with the pre-flight error
    assert!(matches!(
        err,
        SweepError::TooManyCombinations {
            combos: 3,
            max_combos: 2
        }
    ));
}

#[test]
fn bdd_scenario_prior_model_pack_sweep_runs() {
    // GIVEN a pack mixing the no-skill prior with the column model
    let mut config = EngineConfig::from_toml(CONFIG).unwrap();
    config.consensus.policy = PolicyKind::Weighted;
    let orchestrator = SweepOrchestrator::new(config).unwrap();
    let prior = PriorModel::new("prior");
    let cols = ColumnModel::new("cols", "p_up", "p_down");
    let pack = [
        PackMember {
            model: &prior,
            weight: 1.0,
        },
        PackMember {
            model: &cols,
            weight: 2.0,
        },
    ];
    let dataset = signalfold_core::Dataset::new(trending_frame(80));

    // WHEN the pack sweep runs
    let result = orchestrator.sweep_pack(&dataset, &pack).unwrap();

    // THEN every fold is scored
    assert_eq!(result.fold_results.len(), 4);
    assert_eq!(result.skipped_folds, 0);
    assert!(result.aggregate_metrics.total_trades >= 4);
}
