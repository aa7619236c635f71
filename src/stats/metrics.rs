//! Statistics for the demuxer
//!
//! Counters are updated on the routing path with relaxed atomics and read
//! back as a plain snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::registry::{ChannelKind, ChannelState};

/// Per-channel statistics
#[derive(Debug, Clone)]
pub struct ChannelStats {
    /// Channel kind
    pub kind: ChannelKind,
    /// Activation state at snapshot time
    pub state: ChannelState,
    /// Time since the channel became active
    pub active_for: Option<Duration>,
    /// Payloads forwarded
    pub buffers: u64,
    /// Payload bytes forwarded (tag excluded)
    pub bytes: u64,
    /// Events delivered (including activation events)
    pub events: u64,
    /// Successful activations
    pub activations: u64,
    /// Failed deliveries
    pub failures: u64,
}

impl ChannelStats {
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            state: ChannelState::Inactive,
            active_for: None,
            buffers: 0,
            bytes: 0,
            events: 0,
            activations: 0,
            failures: 0,
        }
    }

    /// Average payload size in bytes
    pub fn average_payload_size(&self) -> u64 {
        if self.buffers > 0 {
            self.bytes / self.buffers
        } else {
            0
        }
    }
}

/// Demuxer-wide statistics
#[derive(Debug, Clone)]
pub struct DemuxStats {
    /// Per-channel statistics, in kind order
    pub channels: [ChannelStats; ChannelKind::COUNT],
    /// Buffers rejected for having no tag byte
    pub malformed: u64,
    /// Buffers rejected for an unknown tag
    pub unsupported: u64,
    /// Events dropped because no channel could take them
    pub events_dropped: u64,
}

impl DemuxStats {
    /// Get statistics for one channel
    pub fn channel(&self, kind: ChannelKind) -> &ChannelStats {
        &self.channels[kind.index()]
    }

    /// Total payloads forwarded across channels
    pub fn total_buffers(&self) -> u64 {
        self.channels.iter().map(|c| c.buffers).sum()
    }

    /// Total inbound buffers rejected before routing
    pub fn rejected(&self) -> u64 {
        self.malformed + self.unsupported
    }
}

#[derive(Debug, Default)]
struct ChannelCounters {
    buffers: AtomicU64,
    bytes: AtomicU64,
    events: AtomicU64,
    activations: AtomicU64,
    failures: AtomicU64,
}

/// Live counters owned by the demuxer
#[derive(Debug, Default)]
pub(crate) struct DemuxCounters {
    channels: [ChannelCounters; ChannelKind::COUNT],
    malformed: AtomicU64,
    unsupported: AtomicU64,
    events_dropped: AtomicU64,
}

impl DemuxCounters {
    pub(crate) fn on_buffer(&self, kind: ChannelKind, len: usize) {
        let c = &self.channels[kind.index()];
        c.buffers.fetch_add(1, Ordering::Relaxed);
        c.bytes.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn on_event(&self, kind: ChannelKind) {
        self.channels[kind.index()]
            .events
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_activation(&self, kind: ChannelKind) {
        self.channels[kind.index()]
            .activations
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_failure(&self, kind: ChannelKind) {
        self.channels[kind.index()]
            .failures
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_unsupported(&self) {
        self.unsupported.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot, with channel state and uptime supplied by the caller
    pub(crate) fn snapshot<F>(&self, state_of: F) -> DemuxStats
    where
        F: Fn(ChannelKind) -> (ChannelState, Option<Duration>),
    {
        let channels = ChannelKind::ALL.map(|kind| {
            let c = &self.channels[kind.index()];
            let (state, active_for) = state_of(kind);
            ChannelStats {
                kind,
                state,
                active_for,
                buffers: c.buffers.load(Ordering::Relaxed),
                bytes: c.bytes.load(Ordering::Relaxed),
                events: c.events.load(Ordering::Relaxed),
                activations: c.activations.load(Ordering::Relaxed),
                failures: c.failures.load(Ordering::Relaxed),
            }
        });

        DemuxStats {
            channels,
            malformed: self.malformed.load(Ordering::Relaxed),
            unsupported: self.unsupported.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
        }
    }
}
