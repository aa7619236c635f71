//! Demuxer statistics

pub mod metrics;

pub(crate) use metrics::DemuxCounters;
pub use metrics::{ChannelStats, DemuxStats};
