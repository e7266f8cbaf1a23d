use std::collections::VecDeque;
#[cfg(feature = "rtrb")]
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer, RingBuffer};
#[cfg(feature = "rtrb")]
use tracing::{debug, info, warn};

use crate::dsp::{EnvelopeRamp, WaveShape};
use crate::node::propagation::{Direction, Propagation};

/// Event-rate control for a node. Applied between samples, never during one.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum NodeMessage {
    /// Local gate on/off, as from a controller button.
    Gate(bool),
    /// Trigger arriving from another node's propagation.
    Trigger { energy: f32, direction: Direction },

    AttackTime(f32),
    SustainLevel(f32),
    ReleaseTime(f32),
    Sustain(bool),
    Ramp(EnvelopeRamp),
    FollowerGate(bool),
    GateOnThresh(f32),
    GateOffThresh(f32),
    FollowerAttack(f32),
    FollowerRelease(f32),

    VcoFrequency(f32),
    VcoGlide { hz: f32, rise_ms: f32 },
    VcoShape(WaveShape),
    VcoLfoMod(f32),
    LfoRate(f32),
    LfoShape(WaveShape),

    FeedbackGain(f32),
    FeedbackDelay(f32),
    Mix(f32),
    Mute(bool),

    PropagationEnabled(bool),
    PropagationDecay(f32),
    PropagationDirection(Direction),
    Kill,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<NodeMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<NodeMessage> {
    fn pop(&mut self) -> Option<NodeMessage> {
        Consumer::pop(self).ok()
    }
}

impl MessageReceiver for VecDeque<NodeMessage> {
    fn pop(&mut self) -> Option<NodeMessage> {
        self.pop_front()
    }
}

/// Where a rendering node puts the propagations it raises.
///
/// Called from the audio thread, so implementations must not block or
/// allocate once warmed up.
pub trait PropagationSink {
    fn emit(&mut self, propagation: Propagation);
}

impl PropagationSink for Vec<Propagation> {
    fn emit(&mut self, propagation: Propagation) {
        self.push(propagation);
    }
}

#[cfg(feature = "rtrb")]
const MESSAGE_QUEUE_SIZE: usize = 256;
#[cfg(feature = "rtrb")]
const PROPAGATION_QUEUE_SIZE: usize = 64;

/// Control-side end of a node's queues.
///
/// The handle pushes [`NodeMessage`]s towards the audio thread and collects
/// the [`Propagation`]s it emits. Both directions are single-producer,
/// single-consumer and lock-free.
#[cfg(feature = "rtrb")]
pub struct NodeHandle {
    tx: Producer<NodeMessage>,
    propagations: Consumer<Propagation>,
    dropped: Arc<AtomicU64>,
    dropped_seen: u64,
}

/// Audio-side end of a node's queues.
#[cfg(feature = "rtrb")]
pub struct NodePorts {
    pub rx: Consumer<NodeMessage>,
    pub propagations: Producer<Propagation>,
    dropped: Arc<AtomicU64>,
}

#[cfg(feature = "rtrb")]
pub fn channel() -> (NodeHandle, NodePorts) {
    with_capacity(MESSAGE_QUEUE_SIZE, PROPAGATION_QUEUE_SIZE)
}

/// Like [`channel`] with explicit queue sizes.
#[cfg(feature = "rtrb")]
pub fn with_capacity(messages: usize, propagations: usize) -> (NodeHandle, NodePorts) {
    let (tx, rx) = RingBuffer::<NodeMessage>::new(messages);
    let (ptx, prx) = RingBuffer::<Propagation>::new(propagations);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        NodeHandle {
            tx,
            propagations: prx,
            dropped: Arc::clone(&dropped),
            dropped_seen: 0,
        },
        NodePorts {
            rx,
            propagations: ptx,
            dropped,
        },
    )
}

#[cfg(feature = "rtrb")]
impl NodeHandle {
    /// Queue a message. Returns false if the audio thread has fallen behind
    /// and the queue is full.
    pub fn send(&mut self, msg: NodeMessage) -> bool {
        match self.tx.push(msg) {
            Ok(()) => {
                match msg {
                    NodeMessage::Kill => info!("propagation kill queued"),
                    _ => debug!(?msg, "node message queued"),
                }
                true
            }
            Err(_) => {
                warn!(?msg, "node message queue full, dropping");
                false
            }
        }
    }

    pub fn gate(&mut self, on: bool) -> bool {
        self.send(NodeMessage::Gate(on))
    }

    pub fn poll_propagation(&mut self) -> Option<Propagation> {
        self.propagations.pop().ok()
    }

    /// Total propagations the audio thread dropped on a full queue.
    pub fn dropped_propagations(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Warn about drops since the last call. Returns how many there were.
    pub fn report_dropped(&mut self) -> u64 {
        let total = self.dropped_propagations();
        let new = total - self.dropped_seen;
        if new > 0 {
            warn!(dropped = new, total, "propagation queue full, triggers lost");
            self.dropped_seen = total;
        }
        new
    }
}

#[cfg(feature = "rtrb")]
impl PropagationSink for NodePorts {
    /// Hand a propagation to the control side, counting it if the queue is
    /// full.
    fn emit(&mut self, propagation: Propagation) {
        if self.propagations.push(propagation).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}
