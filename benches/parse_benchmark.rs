use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tfhe_sweep::parser::{self, RunResult};
use tfhe_sweep::stats::GroupStats;

fn generate_child_output(noise_lines: usize) -> String {
    let mut out = String::new();
    for i in 0..noise_lines {
        out.push_str(&format!("bootstrapping gate {i} of {noise_lines}\n"));
    }
    out.push_str("Encryption time: 0.52s\n");
    out.push_str("Homomorphic computation time: 41.87s\n");
    out.push_str("Decryption time: 0.03s\n");
    out.push_str("Score: 12\n");
    out.push_str("Starting pos: 3 5\n");
    out.push_str("Ending pos: 17 19\n");
    out
}

fn parse_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_output");

    // Test different amounts of unrecognised chatter
    for noise in [0, 100, 10000] {
        let output = generate_child_output(noise);
        group.bench_function(&format!("noise_{}", noise), |b| {
            b.iter(|| parser::parse_output(black_box(&output)))
        });
    }

    group.finish();
}

fn aggregate_benchmark(c: &mut Criterion) {
    let runs: Vec<RunResult> = (0..1000)
        .map(|i| RunResult {
            encryption_time: Some(0.5 + i as f64 * 1e-3),
            homomorphic_time: Some(40.0 + (i % 7) as f64),
            score: Some(i % 13),
            mem_avg_mb: if i % 10 == 0 { None } else { Some(120.0) },
            ..Default::default()
        })
        .collect();

    c.bench_function("group_stats_1000_reps", |b| {
        b.iter(|| GroupStats::from_runs(64, 1, black_box(&runs)))
    });
}

criterion_group!(benches, parse_benchmark, aggregate_benchmark);
criterion_main!(benches);
