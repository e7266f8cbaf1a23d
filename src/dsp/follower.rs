/*
Envelope Follower
=================

Turns an audio signal into a slowly varying "how loud is it" control signal.
The nodes use it to CV-gate their envelope from a contact mic or line input.

    rectify:   x = |sample|
    smooth:    value = x + coeff * (value - x)

    coeff = attack   when x > value   (rising, fast)
    coeff = release  otherwise        (falling, slow)

Each coefficient is the one-pole decay for a time constant in milliseconds:

    coeff = exp(-1 / (sample_rate * ms / 1000))

After one time constant a step input has covered ~63% of the distance. The
output is multiplied by SCALE so typical input levels land in the [0, 1] CV
range the envelope thresholds expect.
*/

/// Output gain applied to the smoothed value.
pub const SCALE: f32 = 4.0;

pub struct EnvelopeFollower {
    sample_rate: f32,
    atk_coeff: f32,
    rel_coeff: f32,
    value: f32,
}

impl EnvelopeFollower {
    pub fn new(sample_rate: f32, atk_ms: f32, rel_ms: f32) -> Self {
        let mut follower = Self {
            sample_rate,
            atk_coeff: 0.0,
            rel_coeff: 0.0,
            value: 0.0,
        };
        follower.set_attack_time(atk_ms);
        follower.set_release_time(rel_ms);
        follower
    }

    pub fn set_attack_time(&mut self, atk_ms: f32) {
        self.atk_coeff = time_constant(atk_ms, self.sample_rate);
    }

    pub fn set_release_time(&mut self, rel_ms: f32) {
        self.rel_coeff = time_constant(rel_ms, self.sample_rate);
    }

    /// Feed one input sample, returning the scaled envelope.
    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        let x = sample.abs();
        let coeff = if self.value < x {
            self.atk_coeff
        } else {
            self.rel_coeff
        };
        self.value = x + coeff * (self.value - x);
        SCALE * self.value
    }

    /// Replace each input sample with its follower output.
    pub fn process_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Current smoothed value, before scaling.
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

// Non-positive or non-finite times collapse to an instant (coeff = 0).
fn time_constant(ms: f32, sample_rate: f32) -> f32 {
    let samples = sample_rate * ms / 1000.0;
    if samples > 0.0 && samples.is_finite() {
        (-1.0 / samples).exp()
    } else {
        0.0
    }
}
