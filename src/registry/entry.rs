//! Channel entry and state types
//!
//! This module defines the per-channel state stored in the registry.

use std::time::{Duration, Instant};

use crate::demux::config::FormatDescriptor;

use super::kind::ChannelKind;

/// Activation state of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No buffer of this kind has been routed yet
    Inactive,
    /// First-activation side effects are being delivered
    Activating,
    /// Channel accepts forwarded buffers
    Active,
}

/// Entry for a single channel in the registry
#[derive(Debug, Clone)]
pub struct Channel {
    /// Kind of this channel
    pub kind: ChannelKind,

    /// Current activation state
    pub state: ChannelState,

    /// Format descriptor delivered downstream, if any
    pub format: Option<FormatDescriptor>,

    /// When the channel became active
    pub activated_at: Option<Instant>,
}

impl Channel {
    /// Create a channel entering activation
    pub(super) fn activating(kind: ChannelKind) -> Self {
        Self {
            kind,
            state: ChannelState::Activating,
            format: None,
            activated_at: None,
        }
    }

    /// Check if the channel accepts buffers
    pub fn is_active(&self) -> bool {
        self.state == ChannelState::Active
    }

    /// Check if an output configuration has been delivered downstream
    pub fn is_configured(&self) -> bool {
        self.format.is_some()
    }

    /// Complete activation
    pub(super) fn activate(&mut self, format: Option<FormatDescriptor>) {
        self.state = ChannelState::Active;
        self.format = format;
        self.activated_at = Some(Instant::now());
    }

    /// Time since the channel became active
    pub fn active_duration(&self) -> Option<Duration> {
        self.activated_at.map(|t| t.elapsed())
    }
}
