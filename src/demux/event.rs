//! Control-plane events
//!
//! Events travel alongside buffers on the inbound side and are fanned out to
//! the outbound channels according to their class.

use bytes::Bytes;

/// Timeline segment announced by a segment reset
///
/// Positions are in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Segment {
    /// First position of the segment
    pub start: u64,
    /// Last position of the segment, if bounded
    pub stop: Option<u64>,
    /// Running-time base added to positions
    pub base: u64,
}

impl Segment {
    /// Create an open segment starting at `start`
    pub fn new(start: u64) -> Self {
        Self {
            start,
            stop: None,
            base: 0,
        }
    }

    /// Bound the segment
    pub fn with_stop(mut self, stop: u64) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Set the running-time base
    pub fn with_base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }
}

/// Passthrough event that is neither a stream start nor a segment reset
///
/// Sticky events (stream tags, metadata) are remembered and replayed to
/// channels that activate later. The latest event per name wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomEvent {
    /// Event name, used as the sticky storage key
    pub name: String,
    /// Opaque payload
    pub payload: Bytes,
    /// Whether the event persists for late-activating channels
    pub sticky: bool,
}

impl CustomEvent {
    /// Create a one-shot event
    pub fn new(name: impl Into<String>, payload: Bytes) -> Self {
        Self {
            name: name.into(),
            payload,
            sticky: false,
        }
    }

    /// Create a sticky event
    pub fn sticky(name: impl Into<String>, payload: Bytes) -> Self {
        Self {
            name: name.into(),
            payload,
            sticky: true,
        }
    }
}

/// Control event, inbound or outbound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    /// Start of a stream with its identifier
    StreamStart { stream_id: String },
    /// Timeline reset
    SegmentReset(Segment),
    /// Any other event
    Other(CustomEvent),
}

impl ControlEvent {
    /// Create a stream-start event
    pub fn stream_start(stream_id: impl Into<String>) -> Self {
        ControlEvent::StreamStart {
            stream_id: stream_id.into(),
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &str {
        match self {
            ControlEvent::StreamStart { .. } => "stream-start",
            ControlEvent::SegmentReset(_) => "segment",
            ControlEvent::Other(custom) => &custom.name,
        }
    }

    /// Whether the event must be visible to channels activating later
    pub fn is_sticky(&self) -> bool {
        match self {
            ControlEvent::StreamStart { .. } => true,
            ControlEvent::SegmentReset(_) => false,
            ControlEvent::Other(custom) => custom.sticky,
        }
    }
}
