//! drumnode - run one percussion node on the default audio device
//!
//! Run with: cargo run -- --port 7771

mod app;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use app::NodeApp;
use drumnode::{dsp::WaveShape, NodeConfig};

#[derive(Debug, Parser)]
#[command(name = "drumnode", about = "Networked percussion node")]
struct Args {
    /// UDP port to receive OSC on
    #[arg(short, long, default_value_t = 7771)]
    port: u16,

    /// Output sample rate; the device default if omitted
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Oscillator frequency in Hz
    #[arg(long, default_value_t = 220.0)]
    freq: f32,

    /// Oscillator shape: 0 = sine, 1 = square, 2 = saw
    #[arg(long, default_value_t = 0)]
    shape: i32,

    /// Envelope release time in ms
    #[arg(long, default_value_t = 400.0)]
    release: f32,

    /// Per-hop propagation decay in [0, 1]
    #[arg(long, default_value_t = 0.8)]
    decay: f32,

    /// Don't forward triggers to listeners
    #[arg(long)]
    no_propagate: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = NodeConfig {
        osc_port: args.port,
        vco_frequency: args.freq,
        vco_shape: WaveShape::from_index(args.shape).unwrap_or_default(),
        release_ms: args.release,
        ..NodeConfig::default()
    };
    config.propagation.decay = args.decay;
    config.propagation.enabled = !args.no_propagate;

    NodeApp::new(config, args.sample_rate).run()
}
