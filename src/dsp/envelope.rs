#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Attack/Sustain/Release Envelope Generator
=========================================

The envelope shapes a node's amplitude after every trigger. Unlike a keyboard
ADSR, the nodes are percussive: most envelopes are "one-shot" (no sustain),
rising to a peak and immediately falling away again.

Vocabulary
----------

  level       Current output value, always within [EGEN_MIN, EGEN_MAX] while
              active. Idle output is 0.0.

  gate        Trigger on (start Attack) or off (start Release).

  CV gate     Gating from a continuous control signal (usually an envelope
              follower on the audio input). Crossing `gate_on` upward
              triggers; falling under `gate_off` ends a sustained note.

  ramp        The per-sample step towards the current target. Linear ramps
              add a slope, exponential ramps multiply by a factor.

  falling     The single sample where a Release crosses below half the
  edge        sustain level. Nodes forward their trigger to listeners on
              this edge, after the sound has meaningfully decayed.


The State Machine
-----------------

    ┌──────┐ gate(on) ┌────────┐ level=sus ┌─────────┐ gate(off)
    │ Idle │ ───────→ │ Attack │ ────────→ │ Sustain │ ─────────┐
    └──────┘          └────────┘           └─────────┘          │
        ↑                 │  (no sustain)                       ↓
        │                 └──────────────────────────────→ ┌─────────┐
        │                          level<=EGEN_MIN         │ Release │
        └──────────────────────────────────────────────────└─────────┘

gate(on) restarts Attack from the CURRENT level in any state, so retriggers
during Release don't click.


Ramp Math
---------

Both ramps reach the target in exactly `duration` samples:

    linear:       slope  = (target - current) / duration
                  level += slope

    exponential:  factor = exp((ln(target) - ln(current)) / duration)
                  level *= factor

The logarithm is why EGEN_MIN exists: exponential ramps start and end at
EGEN_MIN, never 0. Both ends are clamped before taking ln().

A countdown of the remaining samples snaps the level to the target on the
last step, so float error can't leave the envelope one sample short or
stuck in a state.
*/

pub const EGEN_MAX: f32 = 1.0;
pub const EGEN_MIN: f32 = 0.001;

const DEFAULT_GATE_ON: f32 = 0.5;
const DEFAULT_GATE_OFF: f32 = 0.3;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeRamp {
    #[default]
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,
    Attack,
    Sustain,
    Release,
}

/// Something worth reacting to that happened during one rendered sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeEvent {
    /// Release crossed below half the sustain level. `cv_gated` tells whether
    /// the cycle was started by the CV input rather than an explicit gate.
    FallingEdge { cv_gated: bool },
    /// Release completed and the envelope went idle.
    Finished,
}

/// One rendered envelope sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeFrame {
    pub level: f32,
    pub event: Option<EnvelopeEvent>,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Add(f32),
    Multiply(f32),
}

#[derive(Debug, Clone, Copy)]
struct Ramp {
    step: Step,
    target: f32,
    remaining: u32,
}

impl Ramp {
    const HOLD: Ramp = Ramp {
        step: Step::Add(0.0),
        target: 0.0,
        remaining: 0,
    };

    fn compute(mode: EnvelopeRamp, from: f32, to: f32, duration_samples: f32) -> Self {
        let remaining = duration_samples.round().max(1.0) as u32;
        let duration = remaining as f32;

        let step = match mode {
            EnvelopeRamp::Linear => Step::Add((to - from) / duration),
            EnvelopeRamp::Exponential => {
                let a0 = from.max(EGEN_MIN).ln();
                let a1 = to.max(EGEN_MIN).ln();
                Step::Multiply(((a1 - a0) / duration).exp())
            }
        };

        Self {
            step,
            target: to,
            remaining,
        }
    }
}

pub struct EnvelopeGenerator {
    sample_rate: f32,

    atk_time_samples: f32,
    rel_time_samples: f32,
    sustain_level: f32,
    do_sustain: bool,
    ramp_mode: EnvelopeRamp,

    state: EnvelopeState,
    level: f32,
    level_previous: f32,
    ramp: Ramp,

    gate_on_thresh: f32,
    gate_off_thresh: f32,
    cv_gate: bool,
    was_cv_gated: bool,
}

impl EnvelopeGenerator {
    /// Build a one-shot envelope. Sustain starts disabled; enable it with
    /// [`set_sustain`](Self::set_sustain).
    pub fn new(sample_rate: f32, atk_ms: f32, sustain: f32, rel_ms: f32) -> Self {
        let mut env = Self {
            sample_rate,
            atk_time_samples: 1.0,
            rel_time_samples: 1.0,
            sustain_level: clamp_level(sustain),
            do_sustain: false,
            ramp_mode: EnvelopeRamp::Linear,
            state: EnvelopeState::Idle,
            level: 0.0,
            level_previous: 0.0,
            ramp: Ramp::HOLD,
            gate_on_thresh: DEFAULT_GATE_ON,
            gate_off_thresh: DEFAULT_GATE_OFF,
            cv_gate: true,
            was_cv_gated: false,
        };
        env.set_attack_time(atk_ms);
        env.set_release_time(rel_ms);
        env
    }

    pub fn set_attack_time(&mut self, atk_ms: f32) {
        self.atk_time_samples = ms_to_samples(atk_ms, self.sample_rate);
        if self.state == EnvelopeState::Attack {
            self.retarget_attack();
        }
    }

    pub fn set_release_time(&mut self, rel_ms: f32) {
        self.rel_time_samples = ms_to_samples(rel_ms, self.sample_rate);
        if self.state == EnvelopeState::Release {
            self.retarget_release();
        }
    }

    /// Set the peak/sustain level, clamped to [EGEN_MIN, EGEN_MAX].
    pub fn set_sustain_level(&mut self, sustain: f32) {
        self.sustain_level = clamp_level(sustain);
        if self.state == EnvelopeState::Attack {
            self.retarget_attack();
        }
    }

    /// Hold at the sustain level until gated off, or release right after the
    /// attack. Disabling sustain while sustaining releases immediately.
    pub fn set_sustain(&mut self, do_sustain: bool) {
        self.do_sustain = do_sustain;
        if !do_sustain && self.state == EnvelopeState::Sustain {
            self.gate(false);
        }
    }

    /// Takes effect on the next transition.
    pub fn set_ramp(&mut self, ramp: EnvelopeRamp) {
        self.ramp_mode = ramp;
    }

    pub fn set_gate_on_thresh(&mut self, thresh: f32) {
        self.gate_on_thresh = thresh;
    }

    pub fn set_gate_off_thresh(&mut self, thresh: f32) {
        self.gate_off_thresh = thresh;
    }

    /// Enable or disable gating from [`gate_cv`](Self::gate_cv).
    pub fn set_cv_gating(&mut self, enabled: bool) {
        self.cv_gate = enabled;
    }

    /// Trigger Attack (`true`) or Release (`false`).
    pub fn gate(&mut self, on: bool) {
        if on {
            self.was_cv_gated = false;
            self.state = EnvelopeState::Attack;
            self.retarget_attack();
        } else if self.state != EnvelopeState::Idle {
            self.state = EnvelopeState::Release;
            self.retarget_release();
        }
    }

    /// Gate from a control signal on [0, 1].
    ///
    /// Idle envelopes trigger when `cv` exceeds the on-threshold. Sustaining
    /// envelopes release when `cv` falls below the off-threshold.
    pub fn gate_cv(&mut self, cv: f32) {
        if !self.cv_gate {
            return;
        }

        match self.state {
            EnvelopeState::Idle if cv > self.gate_on_thresh => {
                self.gate(true);
                self.was_cv_gated = true;
            }
            EnvelopeState::Sustain if self.do_sustain && cv < self.gate_off_thresh => {
                self.gate(false);
            }
            _ => {}
        }
    }

    /// Advance one sample.
    pub fn render(&mut self) -> EnvelopeFrame {
        let mut event = None;

        match self.state {
            EnvelopeState::Attack => {
                let done = self.update_level();
                if done || self.level >= self.sustain_level {
                    self.level = self.sustain_level;
                    if self.do_sustain {
                        self.state = EnvelopeState::Sustain;
                    } else {
                        self.gate(false);
                    }
                }
            }
            EnvelopeState::Release => {
                let done = self.update_level();
                let half = self.sustain_level / 2.0;
                if self.level < half && self.level_previous > half {
                    event = Some(EnvelopeEvent::FallingEdge {
                        cv_gated: self.was_cv_gated,
                    });
                }
                if done || self.level <= EGEN_MIN {
                    self.level = EGEN_MIN;
                    self.state = EnvelopeState::Idle;
                    // An edge and the end can't share a sample unless the
                    // release is a single step; the edge wins.
                    event = event.or(Some(EnvelopeEvent::Finished));
                }
            }
            EnvelopeState::Sustain => {
                self.level = self.sustain_level;
            }
            EnvelopeState::Idle => {
                self.level = 0.0;
            }
        }

        EnvelopeFrame {
            level: self.level,
            event,
        }
    }

    /// Render a block of levels, returning the first event seen.
    pub fn render_block(&mut self, buffer: &mut [f32]) -> Option<EnvelopeEvent> {
        let mut first = None;
        for sample in buffer.iter_mut() {
            let frame = self.render();
            *sample = frame.level;
            first = first.or(frame.event);
        }
        first
    }

    /// Return to Idle without producing events.
    pub fn reset(&mut self) {
        self.state = EnvelopeState::Idle;
        self.level = 0.0;
        self.level_previous = 0.0;
        self.ramp = Ramp::HOLD;
        self.was_cv_gated = false;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn sustain_level(&self) -> f32 {
        self.sustain_level
    }

    pub fn does_sustain(&self) -> bool {
        self.do_sustain
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    pub fn ramp(&self) -> EnvelopeRamp {
        self.ramp_mode
    }

    pub fn was_cv_gated(&self) -> bool {
        self.was_cv_gated
    }

    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Idle
    }

    fn retarget_attack(&mut self) {
        self.prepare_start();
        self.ramp = Ramp::compute(
            self.ramp_mode,
            self.level,
            self.sustain_level,
            self.atk_time_samples,
        );
    }

    fn retarget_release(&mut self) {
        self.prepare_start();
        self.ramp = Ramp::compute(self.ramp_mode, self.level, EGEN_MIN, self.rel_time_samples);
    }

    // Exponential ramps can't leave 0.0, so start them from the floor.
    fn prepare_start(&mut self) {
        if self.ramp_mode == EnvelopeRamp::Exponential && self.level < EGEN_MIN {
            self.level = EGEN_MIN;
        }
    }

    /// Apply one ramp step. Returns true once the ramp has run its course.
    fn update_level(&mut self) -> bool {
        self.level_previous = self.level;

        if self.ramp.remaining <= 1 {
            self.ramp.remaining = 0;
            self.level = self.ramp.target;
            return true;
        }

        self.ramp.remaining -= 1;
        self.level = match self.ramp.step {
            Step::Add(slope) => self.level + slope,
            Step::Multiply(factor) => self.level * factor,
        };
        self.level = self.level.clamp(EGEN_MIN.min(self.level_previous), EGEN_MAX);
        false
    }
}

#[inline]
fn clamp_level(level: f32) -> f32 {
    if level.is_nan() {
        return EGEN_MAX;
    }
    level.clamp(EGEN_MIN, EGEN_MAX)
}

#[inline]
fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    let samples = ms * sample_rate / 1000.0;
    if samples.is_finite() {
        samples.max(1.0)
    } else {
        1.0
    }
}
