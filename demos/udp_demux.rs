//! UDP demux example
//!
//! Run with: cargo run --example udp_demux [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example udp_demux                    # binds to 0.0.0.0:5000
//!   cargo run --example udp_demux localhost          # binds to 127.0.0.1:5000
//!   cargo run --example udp_demux 127.0.0.1:5004     # binds to 127.0.0.1:5004
//!
//! ## Sending
//!
//! Every datagram starts with a type tag: 0 = control, 1 = video, 2 = audio.
//!
//!   printf '\x01hello' | nc -u -w0 127.0.0.1 5000
//!
//! Every few seconds the demo also emits an RTCP receiver report on its own
//! control output, and prints per-channel statistics.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use udp_demux::{
    sink, ChannelItem, ChannelKind, DemuxConfig, Demuxer, Outputs, ReceiverConfig, RtcpSender,
    UdpReceiver,
};

const DEFAULT_PORT: u16 = 5000;
const REPORT_INTERVAL: Duration = Duration::from_secs(5);
const LOCAL_SSRC: u32 = 0x5EED_0001;

/// Parse bind address from command line argument.
///
/// Accepts "localhost", "IP" or "IP:PORT".
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: udp_demux [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:5000)");
}

/// Log everything arriving on one channel
fn spawn_consumer(name: &'static str, mut rx: mpsc::Receiver<ChannelItem>) {
    tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            match item {
                ChannelItem::Event(event) => {
                    tracing::info!(channel = name, event = event.name(), "Event");
                }
                ChannelItem::Format(format) => {
                    tracing::info!(channel = name, format = %format, "Format");
                }
                ChannelItem::Buffer(payload) => {
                    tracing::debug!(channel = name, len = payload.len(), "Buffer");
                }
            }
        }
        tracing::info!(channel = name, "Channel closed");
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let bind_addr = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("udp_demux=debug".parse()?),
        )
        .init();

    let (control, control_rx) = sink::channel(256);
    let (video, video_rx) = sink::channel(256);
    let (audio, audio_rx) = sink::channel(256);
    let (rtcp, rtcp_rx) = sink::channel(16);

    spawn_consumer("control", control_rx);
    spawn_consumer("video", video_rx);
    spawn_consumer("audio", audio_rx);
    spawn_consumer("rtcp", rtcp_rx);

    let demuxer = Arc::new(Demuxer::new(
        DemuxConfig::default()
            .video_format("video/x-h264, stream-format=byte-stream")
            .audio_format("audio/x-opus"),
        Outputs::new()
            .control(Arc::new(control))
            .video(Arc::new(video))
            .audio(Arc::new(audio)),
    ));

    let rtcp_sender = RtcpSender::new(Arc::new(rtcp));
    let reporter = {
        let demuxer = Arc::clone(&demuxer);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REPORT_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;

                if let Err(e) = rtcp_sender.send_receiver_report(LOCAL_SSRC) {
                    tracing::warn!(error = %e, "RTCP report not sent");
                }

                let stats = demuxer.stats();
                for kind in ChannelKind::ALL {
                    let channel = stats.channel(kind);
                    println!(
                        "{:<8} state={:?} buffers={} bytes={}",
                        kind, channel.state, channel.buffers, channel.bytes
                    );
                }
                println!("rejected={} dropped events={}", stats.rejected(), stats.events_dropped);
            }
        })
    };

    println!("Starting UDP demux on {}", bind_addr);
    println!("Send: printf '\\x01hello' | nc -u -w0 {} {}", bind_addr.ip(), bind_addr.port());
    println!();

    let receiver = UdpReceiver::new(ReceiverConfig::with_addr(bind_addr), demuxer);
    let result = receiver
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await;

    reporter.abort();

    if let Err(e) = result {
        eprintln!("Receiver error: {}", e);
    }

    Ok(())
}
