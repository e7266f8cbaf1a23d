//! Benchmarks for the wavetable oscillator.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use drumnode::dsp::{Oscillator, WaveShape};

use crate::BLOCK_SIZES;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (name, shape) in [
            ("sine", WaveShape::Sine),
            ("square", WaveShape::Square),
            ("saw", WaveShape::Saw),
        ] {
            let mut osc = Oscillator::new(48_000.0, 220.0);
            osc.set_wave_shape(shape);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| osc.render_block(black_box(&mut buffer)))
            });
        }

        // Glide re-targets every block so the slope path stays hot
        let mut osc = Oscillator::new(48_000.0, 110.0);
        let mut up = true;
        group.bench_with_input(BenchmarkId::new("glide", size), &size, |b, _| {
            b.iter(|| {
                osc.glide_to(if up { 880.0 } else { 110.0 }, 50.0);
                up = !up;
                osc.render_block(black_box(&mut buffer));
            })
        });

        // Per-sample frequency modulation
        let mut osc = Oscillator::new(48_000.0, 220.0);
        osc.set_f0_mod_amp(0.5);
        let mut lfo = Oscillator::new(48_000.0, 5.0);
        group.bench_with_input(BenchmarkId::new("fm", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    osc.set_f0_mod(lfo.render());
                    *sample = osc.render();
                }
                black_box(&buffer);
            })
        });
    }

    group.finish();
}
