//! Benchmarks for per-sample DSP primitives.

mod delay;
mod envelope;
mod follower;
mod oscillator;

pub use delay::bench_delay;
pub use envelope::bench_envelope;
pub use follower::bench_follower;
pub use oscillator::bench_oscillator;
