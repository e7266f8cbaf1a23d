#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Trigger Propagation
===================

A struck node forwards its trigger to every listener once its own sound has
decayed (the envelope's falling edge). Each hop multiplies the trigger's
energy by the decay factor, so a wave fades out after a few hops:

    node A ──(1.0)──→ B ──(0.8)──→ C ──(0.64)──→ D ...

Energy also scales the receiving node's amplitude, so the wave is audibly
quieter as it travels. Once the forwarded energy would drop below
MIN_PROPAGATION_ENERGY the wave stops.

Kill stops a node from forwarding until it is struck locally again, which is
how a running wave is cut off across the network.
*/

/// Forwarded energy at or below this stops the wave.
pub const MIN_PROPAGATION_ENERGY: f32 = 0.01;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
    #[default]
    Bidirectional,
}

impl Direction {
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Direction::Clockwise),
            1 => Some(Direction::CounterClockwise),
            2 => Some(Direction::Bidirectional),
            _ => None,
        }
    }

    pub fn index(self) -> i32 {
        match self {
            Direction::Clockwise => 0,
            Direction::CounterClockwise => 1,
            Direction::Bidirectional => 2,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationSettings {
    pub enabled: bool,
    /// Energy multiplier applied per hop, in [0, 1].
    pub decay: f32,
    pub direction: Direction,
}

impl Default for PropagationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            decay: 0.8,
            direction: Direction::Bidirectional,
        }
    }
}

/// A trigger to forward to every registered listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Propagation {
    pub energy: f32,
    pub direction: Direction,
}

/// Tracks the wave the node is currently part of.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Wave {
    pub energy: f32,
    pub direction: Direction,
    pub killed: bool,
}

impl Wave {
    pub fn new(direction: Direction) -> Self {
        Self {
            energy: 1.0,
            direction,
            killed: false,
        }
    }

    /// A local strike starts a fresh wave at full energy.
    pub fn strike(&mut self, direction: Direction) {
        self.energy = 1.0;
        self.direction = direction;
        self.killed = false;
    }

    /// A trigger from upstream continues its wave.
    pub fn receive(&mut self, energy: f32, direction: Direction) {
        self.energy = if energy.is_finite() {
            energy.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.direction = direction;
    }

    /// What to forward on a falling edge, if anything.
    pub fn forward(&self, settings: &PropagationSettings) -> Option<Propagation> {
        if !settings.enabled || self.killed {
            return None;
        }
        let energy = self.energy * settings.decay.clamp(0.0, 1.0);
        (energy > MIN_PROPAGATION_ENERGY).then_some(Propagation {
            energy,
            direction: self.direction,
        })
    }
}
