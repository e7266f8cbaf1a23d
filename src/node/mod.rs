//! One node's complete set of audio components.
//!
//! A [`DrumNode`] owns everything that runs on the audio thread: the VCO and
//! its LFO, the envelope generator, the input follower and the feedback
//! delay. Control arrives as [`NodeMessage`]s between samples; the only thing
//! that leaves is an occasional [`Propagation`] to forward to listeners.
//!
//! Per sample:
//!
//! ```text
//! input ─→ follower ─→ gate_cv ─→ envelope ─→ level
//!
//! lfo ─→ vco freq ─→ vco × level × energy ─→ tone ─────────────────┐
//!                                              │                    ↓
//!              input + tone + fb_gain × delayed ─→ circular buffer  mix ─→ out
//!                                              └─→ resonated ───────↑
//! ```
//!
//! Nothing in here logs or allocates once built; control-side logging lives
//! with [`NodeHandle`](message::NodeHandle) and the OSC router.

pub mod config;
pub mod message;
pub mod propagation;

use crate::dsp::{
    CircularBuffer, EnvelopeEvent, EnvelopeFollower, EnvelopeGenerator, EnvelopeState, Oscillator,
};

pub use config::{ConfigError, NodeConfig};
pub use message::{MessageReceiver, NodeMessage, PropagationSink};
#[cfg(feature = "rtrb")]
pub use message::{channel, with_capacity, NodeHandle, NodePorts};
pub use propagation::{Direction, Propagation, PropagationSettings, MIN_PROPAGATION_ENERGY};

use propagation::Wave;

const MAX_FEEDBACK_GAIN: f32 = 0.99;

/// Output of one rendered sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeFrame {
    pub output: f32,
    /// Envelope level for this sample.
    pub level: f32,
    pub propagate: Option<Propagation>,
}

pub struct DrumNode {
    sample_rate: f32,

    vco: Oscillator,
    lfo: Oscillator,
    vco_lfo_mod: f32,
    env: EnvelopeGenerator,
    follower: EnvelopeFollower,

    feedback: CircularBuffer,
    feedback_delay: f32,
    feedback_gain: f32,
    mix: f32,
    muted: bool,

    propagation: PropagationSettings,
    wave: Wave,
}

impl DrumNode {
    /// Build a node from a validated configuration.
    pub fn new(config: &NodeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let fs = config.sample_rate;

        let mut vco = Oscillator::new(fs, config.vco_frequency);
        vco.set_wave_shape(config.vco_shape);
        vco.set_f0_mod_amp(config.vco_lfo_mod);

        let mut lfo = Oscillator::new(fs, config.lfo_rate);
        lfo.set_wave_shape(config.lfo_shape);

        let mut env =
            EnvelopeGenerator::new(fs, config.attack_ms, config.sustain_level, config.release_ms);
        env.set_sustain(config.sustain);
        env.set_ramp(config.ramp);
        env.set_gate_on_thresh(config.gate_on_thresh);
        env.set_gate_off_thresh(config.gate_off_thresh);
        env.set_cv_gating(config.follower_gate);

        let follower =
            EnvelopeFollower::new(fs, config.follower_attack_ms, config.follower_release_ms);

        Ok(Self {
            sample_rate: fs,
            vco,
            lfo,
            vco_lfo_mod: config.vco_lfo_mod,
            env,
            follower,
            feedback: CircularBuffer::with_capacity(config.feedback_capacity),
            feedback_delay: config
                .feedback_delay_samples()
                .clamp(1.0, config.feedback_capacity as f32),
            feedback_gain: config.feedback_gain.clamp(-MAX_FEEDBACK_GAIN, MAX_FEEDBACK_GAIN),
            mix: config.mix,
            muted: false,
            propagation: config.propagation,
            wave: Wave::new(config.propagation.direction),
        })
    }

    /// Apply one control message.
    pub fn handle_message(&mut self, msg: NodeMessage) {
        match msg {
            NodeMessage::Gate(true) => {
                self.wave.strike(self.propagation.direction);
                self.env.gate(true);
            }
            NodeMessage::Gate(false) => self.env.gate(false),
            NodeMessage::Trigger { energy, direction } => {
                self.wave.receive(energy, direction);
                self.env.gate(true);
            }

            NodeMessage::AttackTime(ms) => self.env.set_attack_time(ms),
            NodeMessage::SustainLevel(level) => self.env.set_sustain_level(level),
            NodeMessage::ReleaseTime(ms) => self.env.set_release_time(ms),
            NodeMessage::Sustain(on) => self.env.set_sustain(on),
            NodeMessage::Ramp(ramp) => self.env.set_ramp(ramp),
            NodeMessage::FollowerGate(on) => self.env.set_cv_gating(on),
            NodeMessage::GateOnThresh(t) => self.env.set_gate_on_thresh(t),
            NodeMessage::GateOffThresh(t) => self.env.set_gate_off_thresh(t),
            NodeMessage::FollowerAttack(ms) => self.follower.set_attack_time(ms),
            NodeMessage::FollowerRelease(ms) => self.follower.set_release_time(ms),

            NodeMessage::VcoFrequency(hz) => self.vco.set_f0(hz),
            NodeMessage::VcoGlide { hz, rise_ms } => self.vco.glide_to(hz, rise_ms),
            NodeMessage::VcoShape(shape) => self.vco.set_wave_shape(shape),
            NodeMessage::VcoLfoMod(depth) => {
                self.vco_lfo_mod = depth;
                self.vco.set_f0_mod_amp(depth);
            }
            NodeMessage::LfoRate(hz) => self.lfo.set_f0(hz),
            NodeMessage::LfoShape(shape) => self.lfo.set_wave_shape(shape),

            NodeMessage::FeedbackGain(gain) => {
                self.feedback_gain = sanitize(gain).clamp(-MAX_FEEDBACK_GAIN, MAX_FEEDBACK_GAIN);
            }
            NodeMessage::FeedbackDelay(ms) => {
                let samples = sanitize(ms) * self.sample_rate / 1000.0;
                self.feedback_delay = samples.clamp(1.0, self.feedback.capacity() as f32);
            }
            NodeMessage::Mix(mix) => self.mix = sanitize(mix).clamp(0.0, 1.0),
            NodeMessage::Mute(muted) => self.muted = muted,

            NodeMessage::PropagationEnabled(on) => self.propagation.enabled = on,
            NodeMessage::PropagationDecay(decay) => {
                self.propagation.decay = sanitize(decay).clamp(0.0, 1.0);
            }
            NodeMessage::PropagationDirection(direction) => {
                self.propagation.direction = direction;
            }
            NodeMessage::Kill => self.wave.killed = true,
        }
    }

    /// Apply every queued message.
    pub fn drain<R: MessageReceiver + ?Sized>(&mut self, rx: &mut R) {
        while let Some(msg) = rx.pop() {
            self.handle_message(msg);
        }
    }

    /// Render one sample from one input sample.
    pub fn process_sample(&mut self, input: f32) -> NodeFrame {
        let cv = self.follower.process(input);
        let was_idle = self.env.state() == EnvelopeState::Idle;
        self.env.gate_cv(cv);
        if was_idle && self.env.is_active() {
            self.wave.strike(self.propagation.direction);
        }

        let frame = self.env.render();
        let propagate = match frame.event {
            Some(EnvelopeEvent::FallingEdge { .. }) => self.wave.forward(&self.propagation),
            _ => None,
        };

        let lfo = self.lfo.render();
        if self.vco_lfo_mod != 0.0 && !self.vco.is_gliding() {
            self.vco.set_f0_mod(lfo);
        }
        let tone = self.vco.render() * frame.level * self.wave.energy;

        // The newest slot is already one sample old at this point.
        let delayed = self.feedback.read_interpolated(self.feedback_delay - 1.0);
        let resonated = tone + input + self.feedback_gain * delayed;
        self.feedback.append(resonated);

        let output = if self.muted {
            0.0
        } else {
            self.mix * tone + (1.0 - self.mix) * resonated
        };

        NodeFrame {
            output,
            level: frame.level,
            propagate,
        }
    }

    /// Render a block. `input` shorter than `out` is padded with silence.
    /// Every propagation raised in the block goes to `sink`, in order.
    pub fn render_block<S: PropagationSink + ?Sized>(
        &mut self,
        input: &[f32],
        out: &mut [f32],
        sink: &mut S,
    ) {
        for (i, sample) in out.iter_mut().enumerate() {
            let frame = self.process_sample(input.get(i).copied().unwrap_or(0.0));
            *sample = frame.output;
            if let Some(propagation) = frame.propagate {
                sink.emit(propagation);
            }
        }
    }

    /// Drain `rx`, render a block and emit propagations through `ports`.
    #[cfg(feature = "rtrb")]
    pub fn process_block(&mut self, ports: &mut NodePorts, input: &[f32], out: &mut [f32]) {
        self.drain(&mut ports.rx);
        self.render_block(input, out, ports);
    }

    pub fn envelope(&self) -> &EnvelopeGenerator {
        &self.env
    }

    pub fn vco(&self) -> &Oscillator {
        &self.vco
    }

    pub fn propagation(&self) -> &PropagationSettings {
        &self.propagation
    }

    pub fn energy(&self) -> f32 {
        self.wave.energy
    }

    pub fn is_killed(&self) -> bool {
        self.wave.killed
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

#[inline]
fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
