//! RTCP feedback for the control channel
//!
//! Produces empty Receiver Reports on demand, typically wired to the same
//! downstream as the demuxer's control channel.

pub mod packet;
pub mod sender;

pub use packet::ReceiverReport;
pub use sender::RtcpSender;
