//! Benchmarks for task submission and completion

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kala_rs::prelude::*;

fn bench_submit_get(c: &mut Criterion) {
    let pool = ThreadPool::new(4).unwrap();

    c.bench_function("submit_get_single", |b| {
        b.iter(|| pool.submit(|| black_box(21) * 2).get().unwrap());
    });
}

fn bench_submit_batch(c: &mut Criterion) {
    let pool = ThreadPool::new(4).unwrap();

    c.bench_function("submit_batch_1000", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..1000u64)
                .map(|i| pool.submit(move || black_box(i * i)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.get().unwrap())
                .sum::<u64>()
        });
    });
}

fn bench_accumulate(c: &mut Criterion) {
    let pool = ThreadPool::new(4).unwrap();
    let nums: Vec<i64> = (0..1_000_000).collect();

    c.bench_function("accumulate_1m", |b| {
        b.iter(|| accumulate(&pool, black_box(&nums)).unwrap());
    });

    c.bench_function("sequential_sum_1m", |b| {
        b.iter(|| black_box(&nums).iter().sum::<i64>());
    });
}

criterion_group!(benches, bench_submit_get, bench_submit_batch, bench_accumulate);
criterion_main!(benches);
