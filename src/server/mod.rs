//! UDP ingress
//!
//! Receives the multiplexed stream from one UDP socket and hands each
//! datagram to the demuxer.

pub mod config;
pub mod listener;

pub use config::{ReceiverConfig, MAX_DATAGRAM_SIZE};
pub use listener::UdpReceiver;
