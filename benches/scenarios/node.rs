//! Benchmarks for a single node.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use drumnode::{DrumNode, NodeConfig, NodeMessage, Propagation};

use crate::BLOCK_SIZES;

fn node(config: NodeConfig) -> DrumNode {
    match DrumNode::new(&config) {
        Ok(node) => node,
        Err(err) => panic!("bench config rejected: {err}"),
    }
}

pub fn bench_node(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/node");

    for &size in BLOCK_SIZES {
        let mut out = vec![0.0f32; size];
        let mut props: Vec<Propagation> = Vec::with_capacity(16);
        let input: Vec<f32> = (0..size)
            .map(|i| if i % 64 == 0 { 1.0 } else { 0.0 })
            .collect();

        // Synth only, struck every block
        let mut synth = node(NodeConfig::default());
        group.bench_with_input(BenchmarkId::new("strike", size), &size, |b, _| {
            b.iter(|| {
                props.clear();
                synth.handle_message(NodeMessage::Gate(true));
                synth.render_block(&[], black_box(&mut out), &mut props);
                black_box(props.len())
            })
        });

        // Everything on: follower gating, LFO, feedback
        let mut full = node(NodeConfig {
            vco_lfo_mod: 0.3,
            feedback_gain: 0.6,
            mix: 0.5,
            ..NodeConfig::default()
        });
        group.bench_with_input(BenchmarkId::new("full", size), &size, |b, _| {
            b.iter(|| {
                props.clear();
                full.render_block(black_box(&input), black_box(&mut out), &mut props);
                black_box(props.len())
            })
        });
    }

    group.finish();
}
