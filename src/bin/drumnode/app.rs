//! Node runner: audio in and out on the cpal threads, OSC on the main one.

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rosc::decoder;
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{debug, error, info, warn};

use drumnode::{
    node::{channel, NodeHandle},
    DrumNode, NodeConfig, OscRouter, MAX_BLOCK_SIZE,
};

const RECV_TIMEOUT: Duration = Duration::from_millis(5);
const MAX_DATAGRAM: usize = 1536;
const INPUT_RING_SIZE: usize = 8 * MAX_BLOCK_SIZE;
// Input buffered past this is skipped so latency can't creep up.
const MAX_INPUT_BACKLOG: usize = 2 * MAX_BLOCK_SIZE;

pub struct NodeApp {
    config: NodeConfig,
    sample_rate: Option<u32>,
}

impl NodeApp {
    pub fn new(config: NodeConfig, sample_rate: Option<u32>) -> Self {
        Self {
            config,
            sample_rate,
        }
    }

    /// Run until the process is killed.
    pub fn run(mut self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let mut stream_config: cpal::StreamConfig = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?
            .into();
        if let Some(rate) = self.sample_rate {
            stream_config.sample_rate = cpal::SampleRate(rate);
        }

        self.config.sample_rate = stream_config.sample_rate.0 as f32;
        let channels = stream_config.channels as usize;

        let mut node = DrumNode::new(&self.config).wrap_err("invalid node configuration")?;
        let (mut handle, mut ports) = channel();

        info!(
            sample_rate = self.config.sample_rate,
            channels,
            port = self.config.osc_port,
            "starting node"
        );

        let (input_tx, mut input_rx) = RingBuffer::<f32>::new(INPUT_RING_SIZE);
        let _input_stream = match open_input(&host, stream_config.sample_rate, input_tx) {
            Ok(stream) => Some(stream),
            Err(err) => {
                warn!(?err, "no live input, node will only respond to OSC");
                None
            }
        };

        let mut input_buf = vec![0.0f32; MAX_BLOCK_SIZE];
        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _| {
                let total_frames = data.len() / channels;
                let mut frames_written = 0;
                skip_backlog(&mut input_rx);

                while frames_written < total_frames {
                    let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                    let input = &mut input_buf[..frames];
                    for s in input.iter_mut() {
                        *s = input_rx.pop().unwrap_or(0.0);
                    }
                    let block = &mut render_buf[..frames];
                    node.process_block(&mut ports, input, block);

                    // Mono to all channels
                    let out_off = frames_written * channels;
                    for (i, &s) in block.iter().enumerate() {
                        for ch in 0..channels {
                            data[out_off + i * channels + ch] = s;
                        }
                    }

                    frames_written += frames;
                }
            },
            |err| error!(%err, "audio stream error"),
            None,
        )?;
        stream.play()?;

        let socket = UdpSocket::bind(("0.0.0.0", self.config.osc_port))
            .wrap_err_with(|| format!("failed to bind OSC port {}", self.config.osc_port))?;
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;

        serve(&socket, &mut OscRouter::new(), &mut handle)
    }
}

/// Capture the first channel of the default input at `sample_rate`.
fn open_input(
    host: &cpal::Host,
    sample_rate: cpal::SampleRate,
    mut tx: Producer<f32>,
) -> EyreResult<cpal::Stream> {
    let device = host
        .default_input_device()
        .ok_or_else(|| eyre!("no default input device available"))?;
    let mut config: cpal::StreamConfig = device
        .default_input_config()
        .wrap_err("failed to fetch default input config")?
        .into();
    config.sample_rate = sample_rate;
    let channels = (config.channels as usize).max(1);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _| {
            for frame in data.chunks(channels) {
                // A full ring means the output side stalled; drop new input.
                if tx.push(frame[0]).is_err() {
                    break;
                }
            }
        },
        |err| error!(%err, "input stream error"),
        None,
    )?;
    stream.play()?;

    info!(channels, "capturing live input");
    Ok(stream)
}

fn skip_backlog(input: &mut Consumer<f32>) {
    let excess = input.slots().saturating_sub(MAX_INPUT_BACKLOG);
    if excess > 0 {
        if let Ok(chunk) = input.read_chunk(excess) {
            chunk.commit_all();
        }
    }
}

fn serve(socket: &UdpSocket, router: &mut OscRouter, handle: &mut NodeHandle) -> EyreResult<()> {
    let mut buf = [0u8; MAX_DATAGRAM];

    loop {
        match socket.recv_from(&mut buf) {
            Ok((size, from)) => receive(&buf[..size], from, router, handle),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) => {}
            Err(e) => return Err(e).wrap_err("OSC socket failed"),
        }

        handle.report_dropped();
        while let Some(propagation) = handle.poll_propagation() {
            match router.propagation_packets(&propagation) {
                Ok(packets) => {
                    info!(
                        energy = propagation.energy,
                        listeners = packets.len(),
                        "propagating trigger"
                    );
                    for (listener, bytes) in packets {
                        if let Err(err) = socket.send_to(&bytes, listener) {
                            warn!(%listener, %err, "failed to send trigger");
                        }
                    }
                }
                Err(err) => warn!(?err, "failed to encode trigger"),
            }
        }
    }
}

fn receive(bytes: &[u8], from: SocketAddr, router: &mut OscRouter, handle: &mut NodeHandle) {
    match decoder::decode_udp(bytes) {
        Ok((_, packet)) => {
            for msg in router.handle_packet(&packet) {
                handle.send(msg);
            }
        }
        Err(err) => debug!(%from, ?err, "undecodable datagram dropped"),
    }
}
