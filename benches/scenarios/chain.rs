//! Benchmarks for a trigger travelling down a chain of nodes.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use drumnode::{DrumNode, NodeConfig, NodeMessage, Propagation};

const CHAIN_LEN: usize = 8;

pub fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/chain");
    let config = NodeConfig {
        attack_ms: 1.0,
        release_ms: 4.0,
        follower_gate: false,
        ..NodeConfig::default()
    };

    for &size in &[128usize, 512] {
        let mut nodes: Vec<DrumNode> = (0..CHAIN_LEN)
            .filter_map(|_| DrumNode::new(&config).ok())
            .collect();
        let mut out = vec![0.0f32; size];
        let mut forwarded: Vec<Propagation> = Vec::with_capacity(16);

        group.bench_with_input(BenchmarkId::new("propagate", size), &size, |b, _| {
            b.iter(|| {
                nodes[0].handle_message(NodeMessage::Gate(true));
                for i in 0..nodes.len() {
                    forwarded.clear();
                    nodes[i].render_block(&[], black_box(&mut out), &mut forwarded);
                    if let Some(next) = nodes.get_mut(i + 1) {
                        for p in &forwarded {
                            next.handle_message(NodeMessage::Trigger {
                                energy: p.energy,
                                direction: p.direction,
                            });
                        }
                    }
                }
            })
        });
    }

    group.finish();
}
