//! Tokio channel sink
//!
//! Bridges the synchronous demuxer output to an async consumer through a
//! bounded `mpsc` channel. Delivery never waits: a full channel rejects the
//! item with `SinkError::Full`.

use std::sync::Mutex;

use tokio::sync::mpsc;

use super::{ChannelItem, ChannelSink, SinkError};

/// Sink half of a bounded channel
pub struct ChannelSender {
    tx: Mutex<Option<mpsc::Sender<ChannelItem>>>,
}

/// Create a bounded channel sink and its receiver
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use udp_demux::sink;
/// use udp_demux::{DemuxConfig, Demuxer, Outputs};
///
/// # async fn example() {
/// let (video_tx, mut video_rx) = sink::channel(256);
/// let outputs = Outputs::new().video(Arc::new(video_tx));
/// let demuxer = Demuxer::new(DemuxConfig::default(), outputs);
///
/// tokio::spawn(async move {
///     while let Some(item) = video_rx.recv().await {
///         println!("video: {:?}", item);
///     }
/// });
/// # }
/// ```
pub fn channel(capacity: usize) -> (ChannelSender, mpsc::Receiver<ChannelItem>) {
    let (tx, rx) = mpsc::channel(capacity);

    let sender = ChannelSender {
        tx: Mutex::new(Some(tx)),
    };

    (sender, rx)
}

impl ChannelSender {
    /// Check if the sender is still attached to its receiver
    pub fn is_open(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }
}

impl ChannelSink for ChannelSender {
    fn deliver(&self, item: ChannelItem) -> Result<(), SinkError> {
        let guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        let tx = guard.as_ref().ok_or(SinkError::Closed)?;

        tx.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    /// Drop the sender so the receiver ends after draining queued items
    fn deactivate(&self) {
        self.tx.lock().unwrap_or_else(|e| e.into_inner()).take();
    }
}
