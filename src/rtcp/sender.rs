//! On-demand RTCP Receiver Report emitter
//!
//! Feeds the control channel of a receiving pipeline. The first report sets
//! the stream up (stream start, `application/x-rtcp` format, default
//! segment); later reports only carry the packet.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::demux::{ControlEvent, FormatDescriptor, Segment};
use crate::error::{Error, Result};
use crate::registry::ChannelKind;
use crate::sink::{ChannelItem, ChannelSink, SinkError};

use super::packet::ReceiverReport;

/// Stream id announced by the sender
pub const RTCP_STREAM_ID: &str = "rtcpsender-0";

/// Format announced by the sender
pub const RTCP_FORMAT: &str = "application/x-rtcp";

/// RTCP Receiver Report sender
pub struct RtcpSender {
    sink: Arc<dyn ChannelSink>,
    /// Held across a send so setup and packet stay ordered
    started: Mutex<bool>,
    reports: AtomicU64,
}

impl RtcpSender {
    /// Create a sender writing to `sink`
    pub fn new(sink: Arc<dyn ChannelSink>) -> Self {
        Self {
            sink,
            started: Mutex::new(false),
            reports: AtomicU64::new(0),
        }
    }

    /// Whether the stream setup has been sent
    pub fn is_started(&self) -> bool {
        *self.started.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of reports delivered
    pub fn reports_sent(&self) -> u64 {
        self.reports.load(Ordering::Relaxed)
    }

    /// Emit an empty Receiver Report for `ssrc`
    ///
    /// A failed setup is retried on the next call.
    pub fn send_receiver_report(&self, ssrc: u32) -> Result<()> {
        let mut started = self.started.lock().unwrap_or_else(|e| e.into_inner());

        if !*started {
            self.start_stream().map_err(|source| Error::ActivationFailure {
                kind: ChannelKind::Control,
                source,
            })?;
            *started = true;
            tracing::debug!(stream_id = RTCP_STREAM_ID, "RTCP stream started");
        }

        tracing::debug!(ssrc = ssrc, "Sending RTCP receiver report");

        let packet = ReceiverReport::new(ssrc).encode();
        self.sink
            .deliver(ChannelItem::Buffer(packet))
            .map_err(|source| Error::ForwardFailure {
                kind: ChannelKind::Control,
                source,
            })?;

        self.reports.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn start_stream(&self) -> std::result::Result<(), SinkError> {
        self.sink
            .deliver(ChannelItem::Event(ControlEvent::stream_start(RTCP_STREAM_ID)))?;
        self.sink
            .deliver(ChannelItem::Format(FormatDescriptor::from(RTCP_FORMAT)))?;
        self.sink
            .deliver(ChannelItem::Event(ControlEvent::SegmentReset(Segment::default())))
    }
}
