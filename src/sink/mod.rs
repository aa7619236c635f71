//! Outbound channel sinks
//!
//! Each demuxer output is a `ChannelSink`. A sink receives, in order:
//! a one-time stream start, a one-time format, then tag-stripped payloads
//! interleaved with broadcast events.
//!
//! Sinks are called synchronously from the routing path and must not block.
//! A sink that cannot accept an item returns a `SinkError`; the demuxer
//! reports it and carries on.

pub mod channel;

use bytes::Bytes;

use crate::demux::config::FormatDescriptor;
use crate::demux::event::ControlEvent;

pub use channel::{channel, ChannelSender};

/// Item delivered to an outbound channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelItem {
    /// Control event (stream start, segment reset, passthrough)
    Event(ControlEvent),
    /// Output format applied to the channel
    Format(FormatDescriptor),
    /// Payload with the tag byte removed
    Buffer(Bytes),
}

impl ChannelItem {
    /// Check if this is a data buffer
    pub fn is_buffer(&self) -> bool {
        matches!(self, ChannelItem::Buffer(_))
    }
}

/// Error returned by a sink that rejected an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// No sink is attached to the channel
    NotLinked,
    /// The sink was closed by its consumer
    Closed,
    /// The sink is full and applies backpressure by rejecting
    Full,
    /// The sink refused the item
    Rejected(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::NotLinked => write!(f, "Sink not linked"),
            SinkError::Closed => write!(f, "Sink closed"),
            SinkError::Full => write!(f, "Sink full"),
            SinkError::Rejected(reason) => write!(f, "Sink rejected item: {}", reason),
        }
    }
}

impl std::error::Error for SinkError {}

/// Downstream consumer of one demuxer channel
pub trait ChannelSink: Send + Sync {
    /// Deliver one item
    fn deliver(&self, item: ChannelItem) -> Result<(), SinkError>;

    /// Called once when the demuxer tears the channel down
    fn deactivate(&self) {}
}

impl<F> ChannelSink for F
where
    F: Fn(ChannelItem) -> Result<(), SinkError> + Send + Sync,
{
    fn deliver(&self, item: ChannelItem) -> Result<(), SinkError> {
        self(item)
    }
}
