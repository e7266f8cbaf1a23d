pub mod dsp; // Per-sample primitives
pub mod net; // Listener registry and OSC routing
pub mod node; // One node's component bundle

pub use net::{NodeListenerArray, OscListener, OscRouter};
pub use node::{DrumNode, NodeConfig, NodeFrame, NodeMessage, Propagation, PropagationSink};

pub const MAX_BLOCK_SIZE: usize = 2048;
