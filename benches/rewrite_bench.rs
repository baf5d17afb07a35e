//! Benchmarks for prefilter rewriting.
//!
//! Uses Criterion with 100+ samples and 95% confidence intervals.
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use prefilter::define::parser::parse_condition;
use prefilter::pattern::parser::parse_pattern;
use prefilter::{rewrite, ClauseModel, RewriteMode, RewriteOptions, Subsequence};

/// `S0 Z0* S1 Z1* ... Sn` with a window from `S0` to `Sn` and a
/// cross-reference from every `Si` to `S0`.
fn chain_model(n: usize) -> ClauseModel {
    let mut pattern = Vec::with_capacity(2 * n);
    for i in 0..n {
        pattern.push(format!("S{i}"));
        if i + 1 < n {
            pattern.push(format!("Z{i}*"));
        }
    }
    let mut builder = ClauseModel::builder()
        .source("events")
        .order_by("ts")
        .partition_by("user_id")
        .pattern(&pattern.join(" "))
        .define("S0", "kind = 'start'");
    for i in 1..n {
        let condition = if i + 1 == n {
            format!("S{i}.v > S0.v AND S{i}.ts - S0.ts <= INTERVAL '1' HOUR")
        } else {
            format!("kind = 'step{i}' AND S{i}.v > S0.v")
        };
        builder = builder.define(&format!("S{i}"), &condition);
    }
    builder.build().unwrap()
}

fn bench_rewrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("rewrite");
    let options = RewriteOptions::default();

    for &n in &[2, 4, 8, 16, 32] {
        let model = chain_model(n);
        let subsequence = Subsequence::new((0..n).step_by(2).map(|i| format!("S{i}")));
        group.throughput(Throughput::Elements(n as u64));
        for mode in [RewriteMode::Basic, RewriteMode::Bucket] {
            group.bench_with_input(BenchmarkId::new(mode.to_string(), n), &n, |b, _| {
                b.iter(|| {
                    rewrite(
                        black_box(&model),
                        mode,
                        black_box(&subsequence),
                        &options,
                    )
                });
            });
        }
    }

    group.finish();
}

fn bench_parse_pattern(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_pattern");

    for &n in &[4, 16, 64, 256] {
        let pattern: Vec<String> = (0..n)
            .map(|i| if i % 2 == 0 { format!("S{i}") } else { format!("Z{i}*") })
            .collect();
        let pattern = pattern.join(" ");
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &pattern, |b, p| {
            b.iter(|| parse_pattern(black_box(p)));
        });
    }

    group.finish();
}

fn bench_parse_condition(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_condition");

    for &n in &[1, 8, 64] {
        let condition = (0..n)
            .map(|i| format!("abs(M.x{i} - R.x{i}) <= {i}"))
            .collect::<Vec<_>>()
            .join(" AND ");
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &condition, |b, cond| {
            b.iter(|| parse_condition(black_box(cond)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_rewrite,
    bench_parse_pattern,
    bench_parse_condition
);
criterion_main!(benches);
