//! RTCP Receiver Report encoding
//!
//! ```text
//!    0                   1                   2                   3
//!    0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//!   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!   |V=2|P|  RC=0   |    PT=201     |          length=1             |
//!   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!   |                     SSRC of packet sender                     |
//!   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Only the empty report (no report blocks) is produced.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// RTCP protocol version
pub const RTCP_VERSION: u8 = 2;

/// Receiver Report packet type
pub const PT_RECEIVER_REPORT: u8 = 201;

/// Encoded size of an empty Receiver Report
pub const RR_SIZE: usize = 8;

/// Length field of an empty Receiver Report, in 32-bit words minus one
const RR_LENGTH_WORDS: u16 = 1;

/// Empty RTCP Receiver Report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverReport {
    /// Synchronization source of the reporter
    pub ssrc: u32,
}

impl ReceiverReport {
    pub fn new(ssrc: u32) -> Self {
        Self { ssrc }
    }

    /// Encode to wire format
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(RR_SIZE);
        buf.put_u8(RTCP_VERSION << 6);
        buf.put_u8(PT_RECEIVER_REPORT);
        buf.put_u16(RR_LENGTH_WORDS);
        buf.put_u32(self.ssrc);
        buf.freeze()
    }

    /// Parse an empty Receiver Report
    ///
    /// Report blocks, padding and compound packets are rejected.
    pub fn parse(mut data: &[u8]) -> Result<Self> {
        if data.len() != RR_SIZE {
            return Err(Error::MalformedInput);
        }

        let header = data.get_u8();
        let packet_type = data.get_u8();
        let length = data.get_u16();

        let version = header >> 6;
        let padding = header & 0x20 != 0;
        let report_count = header & 0x1F;

        if version != RTCP_VERSION
            || padding
            || report_count != 0
            || packet_type != PT_RECEIVER_REPORT
            || length != RR_LENGTH_WORDS
        {
            return Err(Error::MalformedInput);
        }

        Ok(Self {
            ssrc: data.get_u32(),
        })
    }
}
