//! Tagged-stream demultiplexer
//!
//! Splits one multiplexed stream, typically received over UDP, into three
//! outbound channels. Every inbound buffer carries a one-byte type tag that
//! selects the channel; the tag is stripped before forwarding.
//!
//! ```text
//!                          ┌──────────────┐
//!   UDP datagrams ───────► │   Demuxer    │ ──► control (tag 0)
//!   [tag][payload ...]     │              │ ──► video   (tag 1)
//!                          │  registry of │ ──► audio   (tag 2)
//!   control events ──────► │  3 channels  │
//!                          └──────────────┘
//! ```
//!
//! Channels are activated lazily on their first buffer: the downstream sink
//! sees a stream start, the configured format, and any sticky events before
//! the first payload.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use udp_demux::{sink, DemuxConfig, Demuxer, Outputs, ReceiverConfig, UdpReceiver};
//!
//! # async fn example() -> udp_demux::Result<()> {
//! let (video, mut video_rx) = sink::channel(256);
//! let (audio, mut audio_rx) = sink::channel(256);
//!
//! let demuxer = Arc::new(Demuxer::new(
//!     DemuxConfig::default()
//!         .video_format("video/x-h264")
//!         .audio_format("audio/x-opus"),
//!     Outputs::new().video(Arc::new(video)).audio(Arc::new(audio)),
//! ));
//!
//! let receiver = UdpReceiver::new(ReceiverConfig::default(), demuxer);
//! receiver
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod demux;
pub mod error;
pub mod registry;
pub mod rtcp;
pub mod server;
pub mod sink;
pub mod stats;

pub use demux::{
    ControlEvent, CustomEvent, DemuxConfig, Demuxer, FanoutReport, FormatDescriptor,
    InboundBuffer, Outputs, Segment,
};
pub use error::{Error, Result};
pub use registry::{ChannelKind, ChannelState};
pub use rtcp::{ReceiverReport, RtcpSender};
pub use server::{ReceiverConfig, UdpReceiver};
pub use sink::{ChannelItem, ChannelSink, SinkError};
pub use stats::{ChannelStats, DemuxStats};
