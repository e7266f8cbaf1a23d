#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Wavetable Oscillator
====================

A single-cycle waveform is computed once into a table, then played back by
stepping through the table at a rate proportional to the requested pitch.

Vocabulary
----------

  phase accumulator   A u32 counter. Its full range [0, 2^32) is one period
                      of the waveform. Overflow wraps it back to zero for
                      free, which is exactly the periodicity we want.

  phase increment     How far the accumulator advances per sample. Encodes
                      the frequency:

                          increment = round(f0 / sample_rate * 2^32)

  table index         The top log2(TABLE_LEN) bits of the accumulator. The
                      remaining low bits are the fractional position inside
                      a table slot, which we discard (no interpolation).


Index Extraction
----------------

With TABLE_LEN = 2048 = 2^11, the index is the top 11 bits:

    accumulator:  [ 11 bits index | 21 bits fraction ]
    index = (accumulator >> 21) & 2047

The shift is derived from the table length so the two can never drift apart.


Glide
-----

A glide moves the increment linearly from its current value to a target
over a rise time. The slope is recomputed when a glide is requested and the
increment is nudged once per rendered sample until the target is hit:

    increment
       ▲           ┌──────── target
       │         ╱
       │       ╱
       │─────╱
       └──────────────────→ samples
             |<--rise-->|

Setting a frequency without a rise time snaps straight to the target and
cancels any glide in flight.


Zero Frequency
--------------

f0 = 0 is passed through: the increment becomes 0 and the oscillator outputs
table[index] forever (0.0 for sine at the start phase). Negative normalized
frequencies wrap modulo 2^32 and walk the table backwards.
*/

/// Wavetable length. Must be a power of two.
pub const TABLE_LEN: usize = 2048;

const INDEX_SHIFT: u32 = 32 - TABLE_LEN.trailing_zeros();
const PHASE_SCALE: f64 = 4_294_967_296.0; // 2^32

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaveShape {
    #[default]
    Sine,
    Square,
    Saw,
}

impl WaveShape {
    /// Map a wire index (0 = sine, 1 = square, 2 = saw) to a shape.
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(WaveShape::Sine),
            1 => Some(WaveShape::Square),
            2 => Some(WaveShape::Saw),
            _ => None,
        }
    }
}

struct Wavetables {
    sine: Vec<f32>,
    square: Vec<f32>,
    saw: Vec<f32>,
}

impl Wavetables {
    fn new() -> Self {
        let mut sine = vec![0.0; TABLE_LEN];
        let mut square = vec![0.0; TABLE_LEN];
        let mut saw = vec![0.0; TABLE_LEN];

        for i in 0..TABLE_LEN {
            let phase = i as f64 / TABLE_LEN as f64;
            let s = (std::f64::consts::TAU * phase).sin() as f32;
            sine[i] = s;
            square[i] = if s < 0.0 { -1.0 } else { 1.0 };
            saw[i] = (2.0 * phase - 1.0) as f32;
        }

        Self { sine, square, saw }
    }

    #[inline]
    fn get(&self, shape: WaveShape) -> &[f32] {
        match shape {
            WaveShape::Sine => &self.sine,
            WaveShape::Square => &self.square,
            WaveShape::Saw => &self.saw,
        }
    }
}

pub struct Oscillator {
    sample_rate: f32,
    tables: Wavetables,
    shape: WaveShape,

    f0: f32,
    f0_base: f32,
    f0_mod: f32,
    f0_mod_amp: f32,

    accumulator: u32,
    increment: u32,

    // Glide state. `glide_position` tracks the increment with sub-integer
    // precision so short glides don't stall on truncated slopes.
    target_increment: u32,
    glide_position: f64,
    glide_slope: f64,
    glide_remaining: u32,

    value: f32,
}

impl Oscillator {
    pub fn new(sample_rate: f32, f0_hz: f32) -> Self {
        let tables = Wavetables::new();
        let value = tables.sine[0];

        let mut osc = Self {
            sample_rate,
            tables,
            shape: WaveShape::Sine,
            f0: 0.0,
            f0_base: 0.0,
            f0_mod: 0.0,
            f0_mod_amp: 0.0,
            accumulator: 0,
            increment: 0,
            target_increment: 0,
            glide_position: 0.0,
            glide_slope: 0.0,
            glide_remaining: 0,
            value,
        };
        osc.set_f0(f0_hz);
        osc
    }

    /// Set the base frequency in Hz. Modulation is reapplied on top.
    pub fn set_f0(&mut self, f0_hz: f32) {
        self.f0_base = f0_hz;
        self.update_f0();
    }

    /// Set the modulation input (typically an LFO sample in [-1, 1]).
    pub fn set_f0_mod(&mut self, modulation: f32) {
        self.f0_mod = modulation;
        self.update_f0();
    }

    /// Set how strongly the modulation input bends the frequency.
    pub fn set_f0_mod_amp(&mut self, amount: f32) {
        self.f0_mod_amp = amount;
        self.update_f0();
    }

    fn update_f0(&mut self) {
        self.f0 = self.f0_base + self.f0_base * self.f0_mod_amp * self.f0_mod;
        self.set_f0_norm(self.f0 / self.sample_rate);
    }

    pub fn set_wave_shape(&mut self, shape: WaveShape) {
        self.shape = shape;
    }

    /// Snap to a normalized frequency, where [0, 0.5) maps to [0, nyquist).
    pub fn set_f0_norm(&mut self, f0_norm: f32) {
        let increment = norm_to_increment(f0_norm);
        self.increment = increment;
        self.target_increment = increment;
        self.glide_position = increment as f64;
        self.glide_slope = 0.0;
        self.glide_remaining = 0;
    }

    /// Glide linearly to a normalized frequency over `rise_time_ms`.
    pub fn glide_to_norm(&mut self, f0_norm: f32, rise_time_ms: f32) {
        let target = norm_to_increment(f0_norm);
        let samples = (rise_time_ms / 1000.0 * self.sample_rate).round();

        if !(samples >= 1.0) {
            self.set_f0_norm(f0_norm);
            return;
        }

        self.target_increment = target;
        self.glide_position = self.increment as f64;
        self.glide_slope = (target as f64 - self.increment as f64) / samples as f64;
        self.glide_remaining = samples as u32;
    }

    /// Glide to a frequency in Hz. The modulation state is left untouched.
    pub fn glide_to(&mut self, f0_hz: f32, rise_time_ms: f32) {
        self.f0_base = f0_hz;
        self.f0 = f0_hz + f0_hz * self.f0_mod_amp * self.f0_mod;
        self.glide_to_norm(self.f0 / self.sample_rate, rise_time_ms);
    }

    /// Render and return one sample.
    #[inline]
    pub fn render(&mut self) -> f32 {
        let idx = ((self.accumulator >> INDEX_SHIFT) as usize) & (TABLE_LEN - 1);
        self.value = self.tables.get(self.shape)[idx];

        if self.glide_remaining > 0 {
            self.glide_remaining -= 1;
            if self.glide_remaining == 0 {
                self.increment = self.target_increment;
                self.glide_position = self.target_increment as f64;
            } else {
                self.glide_position += self.glide_slope;
                self.increment = self.glide_position.round() as u32;
            }
        }

        self.accumulator = self.accumulator.wrapping_add(self.increment);
        self.value
    }

    /// Fill a buffer with consecutive samples.
    pub fn render_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.render();
        }
    }

    pub fn reset_phase(&mut self) {
        self.accumulator = 0;
    }

    /// Last rendered sample.
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn f0(&self) -> f32 {
        self.f0
    }

    pub fn f0_base(&self) -> f32 {
        self.f0_base
    }

    pub fn wave_shape(&self) -> WaveShape {
        self.shape
    }

    pub fn phase(&self) -> u32 {
        self.accumulator
    }

    pub fn phase_increment(&self) -> u32 {
        self.increment
    }

    pub fn target_increment(&self) -> u32 {
        self.target_increment
    }

    pub fn is_gliding(&self) -> bool {
        self.glide_remaining > 0
    }
}

#[inline]
fn norm_to_increment(f0_norm: f32) -> u32 {
    // Truncating through i64 wraps negative and >1.0 frequencies modulo 2^32.
    (f0_norm as f64 * PHASE_SCALE).round() as i64 as u32
}
