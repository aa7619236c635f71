//! Receiver configuration

use std::net::{IpAddr, SocketAddr};

/// Largest UDP payload
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// UDP receiver configuration options
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Receive buffer size; longer datagrams are truncated by the OS
    pub recv_buffer_size: usize,

    /// Only accept datagrams from this source address
    pub source_filter: Option<IpAddr>,

    /// Tear down the demuxer channels when the receiver shuts down
    pub stop_on_shutdown: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            recv_buffer_size: MAX_DATAGRAM_SIZE,
            source_filter: None,
            stop_on_shutdown: true,
        }
    }
}

impl ReceiverConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set receive buffer size
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size.clamp(1, MAX_DATAGRAM_SIZE);
        self
    }

    /// Only accept datagrams from one source
    pub fn source_filter(mut self, source: IpAddr) -> Self {
        self.source_filter = Some(source);
        self
    }

    /// Leave demuxer channels up when the receiver shuts down
    pub fn keep_channels_on_shutdown(mut self) -> Self {
        self.stop_on_shutdown = false;
        self
    }

    /// Check whether a datagram source passes the filter
    pub fn accepts(&self, source: &SocketAddr) -> bool {
        self.source_filter.map_or(true, |ip| ip == source.ip())
    }
}
