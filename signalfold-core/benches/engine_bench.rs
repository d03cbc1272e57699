//! Criterion benchmarks for the evaluation hot path.
//!
//! Benchmarks:
//! 1. Fold generation (purged k-fold with embargo)
//! 2. Position building (threshold search, top percentile)
//! 3. PnL simulation with a momentum gate
//! 4. Consensus voting over a three-member pack

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use signalfold_core::consensus::{combine, ConsensusPolicy, Member, PolicyKind};
use signalfold_core::{
    build_position, ClassProbs, ConfidenceSizing, Direction, MomentumGate, PnlSimulator,
    ProbabilityOutput, SizingMode, SplitConfig,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_probs(rng: &mut StdRng, n: usize) -> ClassProbs {
    let p_up: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
    let p_down = p_up.iter().map(|p| 1.0 - p).collect();
    ClassProbs { p_up, p_down }
}

fn make_labels(rng: &mut StdRng, n: usize) -> Vec<Direction> {
    (0..n)
        .map(|_| match rng.gen_range(0..3) {
            0 => Direction::Up,
            1 => Direction::Down,
            _ => Direction::Flat,
        })
        .collect()
}

fn make_output(rng: &mut StdRng, n: usize) -> ProbabilityOutput {
    let probs = make_probs(rng, n);
    let rows = probs
        .p_up
        .iter()
        .zip(&probs.p_down)
        .map(|(u, d)| vec![*u, *d])
        .collect();
    ProbabilityOutput {
        fold_id: 0,
        test_indices: (0..n).collect(),
        classes: vec![Direction::Up, Direction::Down],
        probabilities: rows,
    }
}

// ── 1. Splits ────────────────────────────────────────────────────────

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");
    let config = SplitConfig {
        n_splits: 5,
        embargo_fraction: 0.01,
    };

    for &rows in &[1_000usize, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::new("five_folds", rows), &rows, |b, &rows| {
            b.iter(|| {
                config
                    .split(black_box(rows))
                    .map(|folds| folds.map(|f| f.train_indices.len()).sum::<usize>())
            });
        });
    }

    group.finish();
}

// ── 2. Positions ─────────────────────────────────────────────────────

fn bench_positions(c: &mut Criterion) {
    let mut group = c.benchmark_group("positions");
    let mut rng = StdRng::seed_from_u64(7);
    let n = 20_000;
    let indices: Vec<usize> = (0..n).collect();
    let probs = make_probs(&mut rng, n);
    let labels = make_labels(&mut rng, n);
    let sized = ConfidenceSizing {
        enabled: true,
        cap: 0.8,
    };

    let thresholds = SizingMode::Threshold(vec![0.5, 0.55, 0.6, 0.65, 0.7, 0.75, 0.8]);
    group.bench_function("threshold_search_7", |b| {
        b.iter(|| build_position(&indices, black_box(&probs), &labels, &thresholds, sized))
    });

    let top = SizingMode::TopPercentile(0.1);
    group.bench_function("top_percentile_10pct", |b| {
        b.iter(|| build_position(&indices, black_box(&probs), &labels, &top, sized))
    });

    group.finish();
}

// ── 3. PnL ───────────────────────────────────────────────────────────

fn bench_pnl(c: &mut Criterion) {
    let mut group = c.benchmark_group("pnl");
    let mut rng = StdRng::seed_from_u64(11);
    let n = 20_000;
    let indices: Vec<usize> = (0..n).collect();
    let probs = make_probs(&mut rng, n);
    let labels = make_labels(&mut rng, n);
    let momentum: Vec<Option<f64>> = (0..n)
        .map(|_| rng.gen_bool(0.9).then(|| rng.gen_range(-1.0..1.0)))
        .collect();
    let position = build_position(
        &indices,
        &probs,
        &labels,
        &SizingMode::default(),
        ConfidenceSizing::default(),
    )
    .unwrap()
    .position;

    let simulator = PnlSimulator::new(2.0).with_momentum_gate(MomentumGate {
        column: "momentum".to_string(),
        min_value: 0.0,
    });
    group.bench_function("gated_20k_rows", |b| {
        b.iter(|| simulator.simulate(black_box(&position), &labels, Some(&momentum)))
    });

    group.finish();
}

// ── 4. Consensus ─────────────────────────────────────────────────────

fn bench_consensus(c: &mut Criterion) {
    let mut group = c.benchmark_group("consensus");
    let mut rng = StdRng::seed_from_u64(23);
    let n = 20_000;
    let outputs: Vec<ProbabilityOutput> = (0..3).map(|_| make_output(&mut rng, n)).collect();
    let labels = make_labels(&mut rng, n);
    let members: Vec<Member<'_>> = outputs
        .iter()
        .zip([1.0, 0.5, 2.0])
        .map(|(output, weight)| Member { output, weight })
        .collect();

    for kind in [PolicyKind::Weighted, PolicyKind::Majority, PolicyKind::All] {
        let policy = ConsensusPolicy {
            policy: kind,
            min_score: 0.55,
            ..Default::default()
        };
        group.bench_with_input(
            BenchmarkId::new("three_members", format!("{kind:?}")),
            &policy,
            |b, policy| {
                b.iter(|| {
                    combine(
                        black_box(&members),
                        policy,
                        &labels,
                        &SizingMode::default(),
                        ConfidenceSizing::default(),
                    )
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_split, bench_positions, bench_pnl, bench_consensus);
criterion_main!(benches);
