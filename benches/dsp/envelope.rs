//! Benchmarks for the envelope generator.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use drumnode::dsp::{EnvelopeGenerator, EnvelopeRamp};

use crate::BLOCK_SIZES;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (name, ramp) in [
            ("strike_linear", EnvelopeRamp::Linear),
            ("strike_exponential", EnvelopeRamp::Exponential),
        ] {
            // Re-strike each block so attack and release both get measured
            let mut env = EnvelopeGenerator::new(48_000.0, 1.0, 0.8, 5.0);
            env.set_ramp(ramp);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    env.gate(true);
                    black_box(env.render_block(black_box(&mut buffer)))
                })
            });
        }

        // Sustain phase (holding steady)
        let mut env = EnvelopeGenerator::new(48_000.0, 1.0, 0.8, 5.0);
        env.set_sustain(true);
        env.gate(true);
        for _ in 0..200 {
            env.render();
        }
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| black_box(env.render_block(black_box(&mut buffer))))
        });
    }

    group.finish();
}
