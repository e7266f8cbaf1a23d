//! Low-level DSP primitives used by the node bundle.
//!
//! These components are allocation-free after construction and realtime-safe,
//! so they can live directly inside a node's audio callback. Each one works a
//! sample at a time; block helpers are thin loops over the per-sample call.

/// Ring buffer with integer and interpolated read-back.
pub mod delay;
/// Attack/sustain/release envelope generator with CV gating.
pub mod envelope;
/// Asymmetric one-pole amplitude follower.
pub mod follower;
/// Wavetable oscillator with fixed-point phase and glide.
pub mod oscillator;

pub use delay::CircularBuffer;
pub use envelope::{
    EnvelopeEvent, EnvelopeFrame, EnvelopeGenerator, EnvelopeRamp, EnvelopeState, EGEN_MAX,
    EGEN_MIN,
};
pub use follower::EnvelopeFollower;
pub use oscillator::{Oscillator, WaveShape};
