//! Benchmarks for circular buffer operations.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use drumnode::dsp::CircularBuffer;

use crate::BLOCK_SIZES;

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    // Delay times in samples
    let delay_times: &[usize] = &[
        48,  // 1ms at 48kHz
        480, // 10ms at 48kHz
        1000,
    ];

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();

        for &delay_samples in delay_times {
            let mut buffer = CircularBuffer::new();
            group.bench_with_input(
                BenchmarkId::new(format!("process_{delay_samples}"), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        let mut sum = 0.0f32;
                        for &s in &input {
                            sum += buffer.process(black_box(s), black_box(delay_samples));
                        }
                        sum
                    })
                },
            );
        }

        // Modulated fractional delay
        let mut buffer = CircularBuffer::new();
        for &sample in &input {
            buffer.append(sample);
        }
        group.bench_with_input(
            BenchmarkId::new("read_interpolated", size),
            &size,
            |b, _| {
                b.iter(|| {
                    let mut sum = 0.0f32;
                    for i in 0..size {
                        let delay_time = 480.0 + (i as f32 * 0.1).sin() * 48.0;
                        sum += buffer.read_interpolated(black_box(delay_time));
                    }
                    sum
                })
            },
        );
    }

    group.finish();
}
