//! Channel registry implementation
//!
//! Owns the activation lifecycle of each logical channel. A single mutex
//! guards registry mutation, activation state, format descriptors and the
//! sticky event store. It is only held for short bookkeeping sections and
//! never across a downstream delivery.

use std::sync::{Mutex, MutexGuard};

use crate::demux::config::FormatDescriptor;
use crate::demux::event::CustomEvent;
use crate::error::{Error, Result};

use super::entry::{Channel, ChannelState};
use super::kind::ChannelKind;
use super::sticky::StickyEvents;

/// Everything a newly created channel needs delivered before it accepts data
#[derive(Debug, Clone)]
pub struct ActivationPlan {
    /// Channel being activated
    pub kind: ChannelKind,
    /// Stream identifier to announce
    pub stream_id: String,
    /// Format descriptor to apply, if one is set
    pub format: Option<FormatDescriptor>,
    /// Remembered sticky events
    pub sticky: Vec<CustomEvent>,
}

/// Outcome of `ChannelRegistry::get_or_activate`
#[derive(Debug, Clone)]
pub enum Activation {
    /// Channel is already active
    ///
    /// If it was activated without a format and one has been set since,
    /// `pending_format` carries it for delivery ahead of the next buffer,
    /// followed by the remembered `sticky` events. `sticky` is empty when
    /// there is no pending format.
    Ready {
        pending_format: Option<FormatDescriptor>,
        sticky: Vec<CustomEvent>,
    },
    /// Channel was just created and must be activated first
    Pending(ActivationPlan),
}

struct Inner {
    channels: [Option<Channel>; ChannelKind::COUNT],
    formats: [Option<FormatDescriptor>; ChannelKind::COUNT],
    sticky: StickyEvents,
    upstream_stream_id: Option<String>,
}

/// Registry of the demuxer's output channels
///
/// Populated lazily: a slot is filled the first time a buffer of that kind
/// is routed, and emptied only by `teardown`.
pub struct ChannelRegistry {
    inner: Mutex<Inner>,
}

impl ChannelRegistry {
    /// Create an empty registry with no format descriptors
    pub fn new() -> Self {
        Self::with_formats([None, None, None])
    }

    /// Create an empty registry with initial format descriptors
    pub fn with_formats(formats: [Option<FormatDescriptor>; ChannelKind::COUNT]) -> Self {
        Self {
            inner: Mutex::new(Inner {
                channels: [None, None, None],
                formats,
                sticky: StickyEvents::new(),
                upstream_stream_id: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Critical sections are plain field updates; poisoned state is still consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Map a tag byte to a channel kind
    pub fn resolve(&self, tag: u8) -> Result<ChannelKind> {
        ChannelKind::from_tag(tag).ok_or(Error::UnsupportedType(tag))
    }

    /// Get the channel for `kind`, creating it if needed
    ///
    /// A newly created channel is left in `Activating` and the caller must
    /// finish with `complete_activation` or `abort_activation`.
    pub fn get_or_activate(&self, kind: ChannelKind) -> Activation {
        let mut inner = self.lock();
        let idx = kind.index();

        if let Some(channel) = &inner.channels[idx] {
            let pending_format = if channel.is_active() && !channel.is_configured() {
                inner.formats[idx].clone()
            } else {
                None
            };
            let sticky = if pending_format.is_some() {
                inner.sticky.replay()
            } else {
                Vec::new()
            };
            return Activation::Ready {
                pending_format,
                sticky,
            };
        }

        inner.channels[idx] = Some(Channel::activating(kind));

        tracing::debug!(kind = %kind, "Channel activating");

        Activation::Pending(ActivationPlan {
            kind,
            stream_id: kind.stream_id(),
            format: inner.formats[idx].clone(),
            sticky: inner.sticky.replay(),
        })
    }

    /// Mark an activating channel active
    pub fn complete_activation(&self, kind: ChannelKind, format: Option<FormatDescriptor>) {
        let mut inner = self.lock();

        if let Some(channel) = inner.channels[kind.index()].as_mut() {
            channel.activate(format);
        }
    }

    /// Drop an activating channel so a later buffer can retry
    pub fn abort_activation(&self, kind: ChannelKind) {
        let mut inner = self.lock();
        let slot = &mut inner.channels[kind.index()];

        if matches!(slot, Some(channel) if channel.state == ChannelState::Activating) {
            *slot = None;
        }
    }

    /// Record that a format was delivered to an active channel
    pub fn mark_configured(&self, kind: ChannelKind, format: FormatDescriptor) {
        let mut inner = self.lock();

        if let Some(channel) = inner.channels[kind.index()].as_mut() {
            if channel.format.is_none() {
                channel.format = Some(format);
            }
        }
    }

    /// Get the activation state of a channel
    pub fn state(&self, kind: ChannelKind) -> ChannelState {
        self.lock().channels[kind.index()]
            .as_ref()
            .map_or(ChannelState::Inactive, |c| c.state)
    }

    /// Get a copy of a channel entry
    pub fn channel(&self, kind: ChannelKind) -> Option<Channel> {
        self.lock().channels[kind.index()].clone()
    }

    /// Invoke `f` for every active channel, in kind order, under the lock
    ///
    /// `f` must not call back into the registry.
    pub fn for_each_active<F>(&self, mut f: F)
    where
        F: FnMut(&Channel),
    {
        let inner = self.lock();

        for channel in inner.channels.iter().flatten() {
            if channel.is_active() {
                f(channel);
            }
        }
    }

    /// Kinds of all active channels, in kind order
    pub fn active_kinds(&self) -> Vec<ChannelKind> {
        let mut kinds = Vec::with_capacity(ChannelKind::COUNT);
        self.for_each_active(|c| kinds.push(c.kind));
        kinds
    }

    /// Kinds of active channels with an established output configuration
    pub fn configured_kinds(&self) -> Vec<ChannelKind> {
        let mut kinds = Vec::with_capacity(ChannelKind::COUNT);
        self.for_each_active(|c| {
            if c.is_configured() {
                kinds.push(c.kind);
            }
        });
        kinds
    }

    /// Number of active channels
    pub fn active_count(&self) -> usize {
        let mut count = 0;
        self.for_each_active(|_| count += 1);
        count
    }

    /// Set or clear the format descriptor for a kind
    ///
    /// A channel that already delivered a format keeps it; the new value is
    /// stored and readable but not renegotiated downstream.
    pub fn set_format(&self, kind: ChannelKind, format: Option<FormatDescriptor>) {
        let mut inner = self.lock();
        let configured = inner.channels[kind.index()]
            .as_ref()
            .is_some_and(|c| c.is_configured());

        if configured {
            tracing::debug!(kind = %kind, "Output format is fixed, change applies after restart");
        }

        inner.formats[kind.index()] = format;
    }

    /// Get the format descriptor for a kind
    pub fn format(&self, kind: ChannelKind) -> Option<FormatDescriptor> {
        self.lock().formats[kind.index()].clone()
    }

    /// Remember a sticky event for later activations
    pub fn remember_sticky(&self, event: &CustomEvent) -> bool {
        self.lock().sticky.store(event)
    }

    /// Number of remembered sticky events
    pub fn sticky_count(&self) -> usize {
        self.lock().sticky.len()
    }

    /// Record the identifier of the upstream stream
    pub fn set_upstream_stream_id(&self, stream_id: String) {
        self.lock().upstream_stream_id = Some(stream_id);
    }

    /// Identifier of the upstream stream, if one was announced
    pub fn upstream_stream_id(&self) -> Option<String> {
        self.lock().upstream_stream_id.clone()
    }

    /// Remove every channel and forget inbound stream state
    ///
    /// Returns the kinds that had a channel. Format descriptors survive.
    pub fn teardown(&self) -> Vec<ChannelKind> {
        let mut inner = self.lock();

        let removed: Vec<ChannelKind> = inner
            .channels
            .iter_mut()
            .filter_map(|slot| slot.take().map(|c| c.kind))
            .collect();

        inner.sticky.clear();
        inner.upstream_stream_id = None;

        removed
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
