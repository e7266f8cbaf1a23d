/*
Circular Buffer
===============

A fixed ring of samples with one write cursor. Each tick appends the newest
sample over the oldest one; reads look back a number of samples from the
newest write.

    capacity = 8, after appending a..k:

      slot:   0   1   2   3   4   5   6   7
            [ i | j | k | d | e | f | g | h ]
                      ↑   ↑
                 newest   write cursor (next to overwrite)

      read(0) = k    read(1) = j    read(3) = h

Fractional delays interpolate linearly between the two neighbouring integer
reads, which is what modulated delays (chorus, flanger, feedback tuning)
need:

    read_interpolated(1.25) = 0.75 * read(1) + 0.25 * read(2)

The longest expressible delay is capacity - 1. Longer requests are clamped to
it, negative or NaN fractional delays read the newest sample.
*/

/// Default ring length, in samples.
pub const BUFFER_SIZE: usize = 1024;

pub struct CircularBuffer {
    buffer: Vec<f32>,
    write_idx: usize,
}

impl CircularBuffer {
    pub fn new() -> Self {
        Self::with_capacity(BUFFER_SIZE)
    }

    /// A zero capacity is rounded up to one slot.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)],
            write_idx: 0,
        }
    }

    /// Write the newest sample, overwriting the oldest.
    #[inline]
    pub fn append(&mut self, sample: f32) {
        self.buffer[self.write_idx] = sample;
        self.write_idx += 1;
        if self.write_idx == self.buffer.len() {
            self.write_idx = 0;
        }
    }

    /// Sample appended `delay` steps before the newest one.
    #[inline]
    pub fn read(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay.min(len - 1);
        let idx = (self.write_idx + len - 1 - delay) % len;
        self.buffer[idx]
    }

    /// Linearly interpolated read at a fractional delay.
    #[inline]
    pub fn read_interpolated(&self, delay: f32) -> f32 {
        let max = self.max_delay() as f32;
        let delay = if delay.is_nan() { 0.0 } else { delay.clamp(0.0, max) };

        let idx_0 = delay.floor();
        let frac = delay - idx_0;
        let idx_0 = idx_0 as usize;
        let idx_1 = delay.ceil() as usize;

        (1.0 - frac) * self.read(idx_0) + frac * self.read(idx_1)
    }

    /// Append `input` and return the sample `delay` steps behind it.
    pub fn process(&mut self, input: f32, delay: usize) -> f32 {
        self.append(input);
        self.read(delay)
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn max_delay(&self) -> usize {
        self.buffer.len() - 1
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_idx = 0;
    }
}

impl Default for CircularBuffer {
    fn default() -> Self {
        Self::new()
    }
}
