//! OSC address routing and outbound trigger encoding.

use std::net::SocketAddrV4;

use rosc::{encoder, OscError, OscMessage, OscPacket, OscType};
use tracing::debug;

use crate::dsp::{EnvelopeRamp, WaveShape};
use crate::net::listeners::NodeListenerArray;
use crate::node::{Direction, NodeMessage, Propagation};

/// Addresses understood by a node.
pub mod addr {
    pub const LISTENER_ADD: &str = "/listener/add";
    pub const LISTENER_REMOVE: &str = "/listener/remove";
    pub const LISTENER_REMOVE_ALL: &str = "/listener/remove_all";

    pub const TRIGGER: &str = "/trigger";
    pub const GATE: &str = "/gate";

    pub const ENV_ATTACK: &str = "/env/atk";
    pub const ENV_SUSTAIN_LEVEL: &str = "/env/sus";
    pub const ENV_RELEASE: &str = "/env/rel";
    pub const ENV_DO_SUSTAIN: &str = "/env/do_sus";
    pub const ENV_RAMP: &str = "/env/ramp";
    pub const ENV_FOLLOWER_GATE: &str = "/env/follower_gate";
    pub const ENV_GATE_ON: &str = "/env/gate_on";
    pub const ENV_GATE_OFF: &str = "/env/gate_off";

    pub const FOLLOWER_ATTACK: &str = "/follower/atk";
    pub const FOLLOWER_RELEASE: &str = "/follower/rel";

    pub const VCO_FREQ: &str = "/vco/freq";
    pub const VCO_GLIDE: &str = "/vco/glide";
    pub const VCO_SHAPE: &str = "/vco/shape";
    pub const VCO_LFO_MOD: &str = "/vco/lfo_mod";
    pub const LFO_RATE: &str = "/lfo/rate";
    pub const LFO_SHAPE: &str = "/lfo/shape";

    pub const FB_GAIN: &str = "/fb/gain";
    pub const FB_DELAY: &str = "/fb/delay";
    pub const MIX: &str = "/mix";
    pub const MUTE: &str = "/mute";

    pub const PROPAGATE_ENABLE: &str = "/propagate/enable";
    pub const PROPAGATE_DECAY: &str = "/propagate/decay";
    pub const PROPAGATE_DIRECTION: &str = "/propagate/direction";
    pub const PROPAGATE_KILL: &str = "/propagate/kill";
}

/// Network-side state of a node: the listener registry plus routing of
/// everything else into [`NodeMessage`]s for the audio thread.
#[derive(Debug, Default)]
pub struct OscRouter {
    listeners: NodeListenerArray,
}

impl OscRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listeners(&self) -> &NodeListenerArray {
        &self.listeners
    }

    pub fn listeners_mut(&mut self) -> &mut NodeListenerArray {
        &mut self.listeners
    }

    /// Route one message. Listener messages are consumed here; anything meant
    /// for the audio thread comes back as a [`NodeMessage`].
    pub fn handle(&mut self, msg: &OscMessage) -> Option<NodeMessage> {
        match msg.addr.as_str() {
            addr::LISTENER_ADD => {
                self.listeners.handle_add_listener(msg);
                None
            }
            addr::LISTENER_REMOVE => {
                self.listeners.handle_remove_listener(msg);
                None
            }
            addr::LISTENER_REMOVE_ALL => {
                self.listeners.handle_remove_listeners(msg);
                None
            }
            _ => {
                let routed = route(msg);
                if routed.is_none() {
                    debug!(addr = %msg.addr, args = ?msg.args, "unroutable message dropped");
                }
                routed
            }
        }
    }

    /// Route every message in a packet, flattening bundles.
    pub fn handle_packet(&mut self, packet: &OscPacket) -> Vec<NodeMessage> {
        let mut out = Vec::new();
        self.collect(packet, &mut out);
        out
    }

    fn collect(&mut self, packet: &OscPacket, out: &mut Vec<NodeMessage>) {
        match packet {
            OscPacket::Message(msg) => out.extend(self.handle(msg)),
            OscPacket::Bundle(bundle) => {
                for inner in &bundle.content {
                    self.collect(inner, out);
                }
            }
        }
    }

    /// Encode one `/trigger` datagram per registered listener.
    pub fn propagation_packets(
        &self,
        propagation: &Propagation,
    ) -> Result<Vec<(SocketAddrV4, Vec<u8>)>, OscError> {
        let bytes = encode_trigger(propagation)?;
        Ok(self
            .listeners
            .iter()
            .map(|listener| (*listener, bytes.clone()))
            .collect())
    }
}

/// Map a non-listener message onto a [`NodeMessage`].
pub fn route(msg: &OscMessage) -> Option<NodeMessage> {
    let args = msg.args.as_slice();
    let message = match msg.addr.as_str() {
        addr::TRIGGER => {
            let energy = match args.first() {
                Some(arg) => as_f32(arg)?,
                None => 1.0,
            };
            let direction = match args.get(1) {
                Some(arg) => Direction::from_index(as_i32(arg)?)?,
                None => Direction::default(),
            };
            NodeMessage::Trigger { energy, direction }
        }
        addr::GATE => NodeMessage::Gate(single(args, as_bool)?),

        addr::ENV_ATTACK => NodeMessage::AttackTime(single(args, as_f32)?),
        addr::ENV_SUSTAIN_LEVEL => NodeMessage::SustainLevel(single(args, as_f32)?),
        addr::ENV_RELEASE => NodeMessage::ReleaseTime(single(args, as_f32)?),
        addr::ENV_DO_SUSTAIN => NodeMessage::Sustain(single(args, as_bool)?),
        addr::ENV_RAMP => NodeMessage::Ramp(match single(args, as_i32)? {
            0 => EnvelopeRamp::Linear,
            1 => EnvelopeRamp::Exponential,
            _ => return None,
        }),
        addr::ENV_FOLLOWER_GATE => NodeMessage::FollowerGate(single(args, as_bool)?),
        addr::ENV_GATE_ON => NodeMessage::GateOnThresh(single(args, as_f32)?),
        addr::ENV_GATE_OFF => NodeMessage::GateOffThresh(single(args, as_f32)?),

        addr::FOLLOWER_ATTACK => NodeMessage::FollowerAttack(single(args, as_f32)?),
        addr::FOLLOWER_RELEASE => NodeMessage::FollowerRelease(single(args, as_f32)?),

        addr::VCO_FREQ => NodeMessage::VcoFrequency(single(args, as_f32)?),
        addr::VCO_GLIDE => match args {
            [hz, rise] => NodeMessage::VcoGlide {
                hz: as_f32(hz)?,
                rise_ms: as_f32(rise)?,
            },
            _ => return None,
        },
        addr::VCO_SHAPE => NodeMessage::VcoShape(WaveShape::from_index(single(args, as_i32)?)?),
        addr::VCO_LFO_MOD => NodeMessage::VcoLfoMod(single(args, as_f32)?),
        addr::LFO_RATE => NodeMessage::LfoRate(single(args, as_f32)?),
        addr::LFO_SHAPE => NodeMessage::LfoShape(WaveShape::from_index(single(args, as_i32)?)?),

        addr::FB_GAIN => NodeMessage::FeedbackGain(single(args, as_f32)?),
        addr::FB_DELAY => NodeMessage::FeedbackDelay(single(args, as_f32)?),
        addr::MIX => NodeMessage::Mix(single(args, as_f32)?),
        addr::MUTE => NodeMessage::Mute(single(args, as_bool)?),

        addr::PROPAGATE_ENABLE => NodeMessage::PropagationEnabled(single(args, as_bool)?),
        addr::PROPAGATE_DECAY => NodeMessage::PropagationDecay(single(args, as_f32)?),
        addr::PROPAGATE_DIRECTION => {
            NodeMessage::PropagationDirection(Direction::from_index(single(args, as_i32)?)?)
        }
        addr::PROPAGATE_KILL => NodeMessage::Kill,

        _ => return None,
    };
    Some(message)
}

/// Encode the `/trigger` message a node sends to its listeners.
pub fn encode_trigger(propagation: &Propagation) -> Result<Vec<u8>, OscError> {
    encoder::encode(&OscPacket::Message(trigger_message(propagation)))
}

pub fn trigger_message(propagation: &Propagation) -> OscMessage {
    OscMessage {
        addr: addr::TRIGGER.to_string(),
        args: vec![
            OscType::Float(propagation.energy),
            OscType::Int(propagation.direction.index()),
        ],
    }
}

fn single<T>(args: &[OscType], parse: fn(&OscType) -> Option<T>) -> Option<T> {
    match args {
        [arg] => parse(arg),
        _ => None,
    }
}

fn as_f32(arg: &OscType) -> Option<f32> {
    let value = match arg {
        OscType::Float(v) => *v,
        OscType::Double(v) => *v as f32,
        OscType::Int(v) => *v as f32,
        OscType::Long(v) => *v as f32,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn as_i32(arg: &OscType) -> Option<i32> {
    match arg {
        OscType::Int(v) => Some(*v),
        OscType::Long(v) => i32::try_from(*v).ok(),
        _ => None,
    }
}

fn as_bool(arg: &OscType) -> Option<bool> {
    match arg {
        OscType::Bool(b) => Some(*b),
        OscType::Int(v) => Some(*v != 0),
        OscType::Float(v) => Some(*v != 0.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::{decoder, OscBundle, OscTime};

    fn msg(addr: &str, args: Vec<OscType>) -> OscMessage {
        OscMessage {
            addr: addr.to_string(),
            args,
        }
    }

    #[test]
    fn listener_messages_update_registry() {
        let mut router = OscRouter::new();
        let args: Vec<OscType> = [10, 0, 0, 7, 7771].into_iter().map(OscType::Int).collect();
        assert_eq!(router.handle(&msg(addr::LISTENER_ADD, args.clone())), None);
        assert_eq!(router.listeners().count(), 1);

        router.handle(&msg(addr::LISTENER_REMOVE, args));
        assert_eq!(router.listeners().count(), 0);
    }

    #[test]
    fn parameter_messages_route_to_node() {
        assert_eq!(
            route(&msg(addr::ENV_ATTACK, vec![OscType::Float(12.0)])),
            Some(NodeMessage::AttackTime(12.0))
        );
        assert_eq!(
            route(&msg(addr::VCO_SHAPE, vec![OscType::Int(2)])),
            Some(NodeMessage::VcoShape(WaveShape::Saw))
        );
        assert_eq!(
            route(&msg(addr::GATE, vec![OscType::Int(1)])),
            Some(NodeMessage::Gate(true))
        );
        assert_eq!(
            route(&msg(addr::PROPAGATE_KILL, vec![])),
            Some(NodeMessage::Kill)
        );
    }

    #[test]
    fn malformed_arguments_are_dropped() {
        assert_eq!(route(&msg(addr::ENV_ATTACK, vec![])), None);
        assert_eq!(
            route(&msg(addr::ENV_ATTACK, vec![OscType::String("fast".into())])),
            None
        );
        assert_eq!(route(&msg(addr::VCO_SHAPE, vec![OscType::Int(9)])), None);
        assert_eq!(
            route(&msg(addr::MIX, vec![OscType::Float(f32::NAN)])),
            None
        );
        assert_eq!(route(&msg("/nope", vec![])), None);
    }

    #[test]
    fn bare_trigger_defaults_to_full_energy() {
        assert_eq!(
            route(&msg(addr::TRIGGER, vec![])),
            Some(NodeMessage::Trigger {
                energy: 1.0,
                direction: Direction::Bidirectional
            })
        );
    }

    #[test]
    fn bundles_are_flattened() {
        let mut router = OscRouter::new();
        let packet = OscPacket::Bundle(OscBundle {
            timetag: OscTime {
                seconds: 0,
                fractional: 1,
            },
            content: vec![
                OscPacket::Message(msg(addr::MUTE, vec![OscType::Bool(true)])),
                OscPacket::Message(msg(addr::LFO_RATE, vec![OscType::Double(0.5)])),
            ],
        });
        assert_eq!(
            router.handle_packet(&packet),
            vec![NodeMessage::Mute(true), NodeMessage::LfoRate(0.5)]
        );
    }

    #[test]
    fn propagation_fans_out_to_every_listener() {
        let mut router = OscRouter::new();
        for last in 1..=3 {
            let args = [10, 0, 0, last, 7771].into_iter().map(OscType::Int).collect();
            router.handle(&msg(addr::LISTENER_ADD, args));
        }

        let propagation = Propagation {
            energy: 0.5,
            direction: Direction::CounterClockwise,
        };
        let packets = router.propagation_packets(&propagation).unwrap();
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[2].0.ip().octets(), [10, 0, 0, 3]);

        let (_, decoded) = decoder::decode_udp(&packets[0].1).unwrap();
        let OscPacket::Message(decoded) = decoded else {
            panic!("expected a message");
        };
        assert_eq!(
            route(&decoded),
            Some(NodeMessage::Trigger {
                energy: 0.5,
                direction: Direction::CounterClockwise
            })
        );
    }
}
