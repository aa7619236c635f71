//! Fan-out delivery report

use crate::error::{Error, Result};
use crate::registry::ChannelKind;
use crate::sink::SinkError;

/// Outcome of delivering one event to several channels
///
/// Delivery is best-effort: a failing channel does not stop delivery to the
/// others, its error is collected here instead.
#[derive(Debug, Default)]
pub struct FanoutReport {
    delivered: Vec<ChannelKind>,
    failed: Vec<(ChannelKind, SinkError)>,
}

impl FanoutReport {
    pub(crate) fn record_delivered(&mut self, kind: ChannelKind) {
        self.delivered.push(kind);
    }

    pub(crate) fn record_failure(&mut self, kind: ChannelKind, error: SinkError) {
        self.failed.push((kind, error));
    }

    /// Channels that accepted the event
    pub fn delivered(&self) -> &[ChannelKind] {
        &self.delivered
    }

    /// Channels that rejected the event
    pub fn failures(&self) -> &[(ChannelKind, SinkError)] {
        &self.failed
    }

    /// Whether the event reached no channel and none was attempted
    pub fn is_dropped(&self) -> bool {
        self.delivered.is_empty() && self.failed.is_empty()
    }

    /// Whether every attempted delivery succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Convert to a result, reporting the first failure
    pub fn into_result(self) -> Result<Vec<ChannelKind>> {
        match self.failed.into_iter().next() {
            Some((kind, source)) => Err(Error::ForwardFailure { kind, source }),
            None => Ok(self.delivered),
        }
    }
}
