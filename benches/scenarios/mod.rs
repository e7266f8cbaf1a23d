//! Whole-node benchmarks.
//!
//! These run the same per-sample path the audio callback does, including
//! message draining and trigger propagation between nodes.

mod chain;
mod node;

pub use chain::bench_chain;
pub use node::bench_node;
