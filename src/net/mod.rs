//! Network-facing side of a node.
//!
//! Everything here runs at event rate on the control thread. Inbound OSC is
//! either consumed by the listener registry or routed into
//! [`NodeMessage`](crate::node::NodeMessage)s for the audio thread; outbound
//! propagation is encoded into one datagram per listener.

/// Registry of downstream listeners.
pub mod listeners;
/// Address routing and trigger encoding.
pub mod osc;

pub use listeners::{NodeListenerArray, OscListener};
pub use osc::{route, OscRouter};
