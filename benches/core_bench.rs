//! Benchmarks for cloudjar core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use cloudjar::core::{parser, planner, resolver};
use cloudjar::stack::composition::searchx;
use cloudjar::tripwire::hasher;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_blake3_string(c: &mut Criterion) {
    let mut group = c.benchmark_group("blake3_string");
    for size in [64, 256, 1024, 4096] {
        let input: String = "x".repeat(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| black_box(hasher::hash_string(black_box(input))));
        });
    }
    group.finish();
}

fn bench_yaml_parse(c: &mut Criterion) {
    let yaml = serde_yaml_ng::to_string(&searchx()).unwrap();
    c.bench_function("yaml_parse_searchx", |b| {
        b.iter(|| black_box(parser::parse_config(black_box(&yaml)).unwrap()));
    });
}

fn bench_validate(c: &mut Criterion) {
    let config = searchx();
    c.bench_function("validate_searchx", |b| {
        b.iter(|| black_box(parser::validate_config(black_box(&config))));
    });
}

fn bench_topo_sort(c: &mut Criterion) {
    let config = searchx();
    c.bench_function("topo_sort_searchx", |b| {
        b.iter(|| black_box(resolver::build_execution_order(black_box(&config)).unwrap()));
    });
}

fn bench_plan(c: &mut Criterion) {
    let config = searchx();
    let order = resolver::build_execution_order(&config).unwrap();
    c.bench_function("plan_searchx", |b| {
        b.iter(|| black_box(planner::plan(black_box(&config), &order, None).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_blake3_string,
    bench_yaml_parse,
    bench_validate,
    bench_topo_sort,
    bench_plan
);
criterion_main!(benches);
