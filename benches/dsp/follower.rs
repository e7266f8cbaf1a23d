//! Benchmarks for the envelope follower.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use drumnode::dsp::EnvelopeFollower;

use crate::BLOCK_SIZES;

pub fn bench_follower(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/follower");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut buffer = input.clone();

        let mut follower = EnvelopeFollower::new(48_000.0, 1.0, 50.0);
        group.bench_with_input(BenchmarkId::new("process_block", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                follower.process_block(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
