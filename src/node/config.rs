#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dsp::{delay::BUFFER_SIZE, EnvelopeRamp, WaveShape};
use crate::node::propagation::PropagationSettings;

/// Reasons a [`NodeConfig`] can't build a node.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("sample rate must be positive and finite, got {0}")]
    SampleRate(f32),
    #[error("{name} must be a non-negative finite time in ms, got {value}")]
    Time { name: &'static str, value: f32 },
    #[error("{name} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("feedback buffer needs at least one slot")]
    EmptyFeedbackBuffer,
    #[error("feedback delay of {delay_ms} ms needs {needed} samples, buffer holds {capacity}")]
    DelayTooLong {
        delay_ms: f32,
        needed: usize,
        capacity: usize,
    },
}

/// Everything needed to build a [`DrumNode`](crate::node::DrumNode).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    pub sample_rate: f32,

    pub vco_frequency: f32,
    pub vco_shape: WaveShape,
    /// Depth of LFO frequency modulation on the VCO.
    pub vco_lfo_mod: f32,
    pub lfo_rate: f32,
    pub lfo_shape: WaveShape,

    pub attack_ms: f32,
    pub sustain_level: f32,
    pub release_ms: f32,
    pub sustain: bool,
    pub ramp: EnvelopeRamp,
    pub gate_on_thresh: f32,
    pub gate_off_thresh: f32,

    /// Gate the envelope from the input follower.
    pub follower_gate: bool,
    pub follower_attack_ms: f32,
    pub follower_release_ms: f32,

    pub feedback_capacity: usize,
    pub feedback_delay_ms: f32,
    pub feedback_gain: f32,
    /// Synth/feedback balance: 1.0 is synth only.
    pub mix: f32,

    pub propagation: PropagationSettings,
    pub osc_port: u16,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            vco_frequency: 220.0,
            vco_shape: WaveShape::Sine,
            vco_lfo_mod: 0.0,
            lfo_rate: 2.0,
            lfo_shape: WaveShape::Sine,
            attack_ms: 5.0,
            sustain_level: 0.8,
            release_ms: 400.0,
            sustain: false,
            ramp: EnvelopeRamp::Linear,
            gate_on_thresh: 0.5,
            gate_off_thresh: 0.3,
            follower_gate: true,
            follower_attack_ms: 1.0,
            follower_release_ms: 50.0,
            feedback_capacity: BUFFER_SIZE,
            feedback_delay_ms: 5.0,
            feedback_gain: 0.0,
            mix: 1.0,
            propagation: PropagationSettings::default(),
            osc_port: 7771,
        }
    }
}

impl NodeConfig {
    pub fn with_sample_rate(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate > 0.0 && self.sample_rate.is_finite()) {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }

        for (name, value) in [
            ("attack_ms", self.attack_ms),
            ("release_ms", self.release_ms),
            ("follower_attack_ms", self.follower_attack_ms),
            ("follower_release_ms", self.follower_release_ms),
            ("feedback_delay_ms", self.feedback_delay_ms),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::Time { name, value });
            }
        }

        check_range("sustain_level", self.sustain_level, 0.0, 1.0)?;
        check_range("mix", self.mix, 0.0, 1.0)?;
        check_range("feedback_gain", self.feedback_gain, -1.0, 1.0)?;
        check_range("propagation.decay", self.propagation.decay, 0.0, 1.0)?;

        if self.feedback_capacity == 0 {
            return Err(ConfigError::EmptyFeedbackBuffer);
        }

        // A delay of `capacity` samples reads the oldest slot.
        let needed = self.feedback_delay_samples().ceil() as usize;
        if needed > self.feedback_capacity {
            return Err(ConfigError::DelayTooLong {
                delay_ms: self.feedback_delay_ms,
                needed,
                capacity: self.feedback_capacity,
            });
        }

        Ok(())
    }

    pub fn feedback_delay_samples(&self) -> f32 {
        self.feedback_delay_ms * self.sample_rate / 1000.0
    }
}

fn check_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(NodeConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_sample_rate() {
        let config = NodeConfig::with_sample_rate(0.0);
        assert_eq!(config.validate(), Err(ConfigError::SampleRate(0.0)));
    }

    #[test]
    fn rejects_negative_times() {
        let config = NodeConfig {
            release_ms: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Time {
                name: "release_ms",
                ..
            })
        ));
    }

    #[test]
    fn rejects_delay_longer_than_buffer() {
        let config = NodeConfig {
            feedback_capacity: 128,
            feedback_delay_ms: 10.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DelayTooLong { needed: 480, .. })
        ));
    }

    #[test]
    fn delay_may_fill_the_buffer_exactly() {
        let config = NodeConfig {
            sample_rate: 1_000.0,
            feedback_capacity: 8,
            feedback_delay_ms: 8.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Ok(()));

        let config = NodeConfig {
            feedback_delay_ms: 9.0,
            ..config
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DelayTooLong {
                needed: 9,
                capacity: 8,
                ..
            })
        ));
    }

    #[test]
    fn rejects_out_of_range_mix() {
        let config = NodeConfig {
            mix: 1.5,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mix"));
    }
}
