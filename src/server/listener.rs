//! UDP receiver
//!
//! Binds one UDP socket and feeds every datagram into the demuxer. This is
//! the single producer the demuxer expects.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;

use crate::demux::Demuxer;
use crate::error::{Error, Result};
use crate::server::config::ReceiverConfig;

/// UDP ingress for a demuxer
pub struct UdpReceiver {
    config: ReceiverConfig,
    demuxer: Arc<Demuxer>,
}

impl UdpReceiver {
    /// Create a new receiver
    pub fn new(config: ReceiverConfig, demuxer: Arc<Demuxer>) -> Self {
        Self { config, demuxer }
    }

    /// Get a reference to the demuxer
    pub fn demuxer(&self) -> &Arc<Demuxer> {
        &self.demuxer
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<UdpSocket> {
        let socket = UdpSocket::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %socket.local_addr()?, "UDP demux receiver listening");
        Ok(socket)
    }

    /// Run the receiver
    ///
    /// This method only returns on a socket error.
    pub async fn run(&self) -> Result<()> {
        let socket = self.bind().await?;
        self.recv_loop(&socket).await
    }

    /// Run the receiver with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let socket = self.bind().await?;
        self.serve_until(socket, shutdown).await
    }

    /// Serve an already bound socket until `shutdown` completes
    pub async fn serve_until<F>(&self, socket: UdpSocket, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.recv_loop(&socket) => result,
        };

        // The producer is quiesced once the loop is gone
        if self.config.stop_on_shutdown {
            self.demuxer.stop();
        }

        result
    }

    async fn recv_loop(&self, socket: &UdpSocket) -> Result<()> {
        let mut buf = vec![0u8; self.config.recv_buffer_size];

        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, peer)) => {
                    self.handle_datagram(Bytes::copy_from_slice(&buf[..len]), peer);
                }
                Err(e) if is_transient(&e) => {
                    tracing::debug!(error = %e, "Transient receive error");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to receive datagram");
                    return Err(Error::Io(e));
                }
            }
        }
    }

    fn handle_datagram(&self, data: Bytes, peer: SocketAddr) {
        if !self.config.accepts(&peer) {
            tracing::debug!(peer = %peer, "Ignoring datagram from filtered source");
            return;
        }

        if let Err(e) = self.demuxer.push_buffer(data) {
            if e.is_rejection() {
                tracing::debug!(peer = %peer, error = %e, "Datagram rejected");
            } else {
                tracing::debug!(peer = %peer, error = %e, "Datagram not delivered");
            }
        }
    }
}

/// Errors a UDP socket reports for earlier sends (e.g. ICMP port unreachable)
fn is_transient(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::WouldBlock
    )
}
