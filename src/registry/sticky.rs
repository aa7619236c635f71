//! Sticky event store for late-activating channels
//!
//! When a channel activates after the stream has been running, it needs the
//! persistent stream metadata (tags, custom sticky events) that earlier
//! channels already saw. Segment resets are never stored here; a channel
//! starts its own timeline from its activation-time stream start.

use crate::demux::event::CustomEvent;

/// Remembered sticky events, in order of first arrival
#[derive(Debug, Default)]
pub struct StickyEvents {
    events: Vec<CustomEvent>,
}

impl StickyEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember an event, replacing any earlier one with the same name
    ///
    /// Non-sticky events are ignored. Returns true if the event was stored.
    pub fn store(&mut self, event: &CustomEvent) -> bool {
        if !event.sticky {
            return false;
        }

        match self.events.iter_mut().find(|e| e.name == event.name) {
            Some(existing) => *existing = event.clone(),
            None => self.events.push(event.clone()),
        }
        true
    }

    /// Events to replay to a newly activated channel
    pub fn replay(&self) -> Vec<CustomEvent> {
        self.events.clone()
    }

    /// Get a stored event by name
    pub fn get(&self, name: &str) -> Option<&CustomEvent> {
        self.events.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
