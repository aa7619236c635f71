//! Inbound tagged buffers
//!
//! The tag byte is split off without copying: the payload is a `Bytes`
//! slice of the original datagram starting at offset 1.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::registry::ChannelKind;

/// Size of the type tag prefix
pub const TAG_SIZE: usize = 1;

/// Inbound buffer split into its tag and payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundBuffer {
    /// Raw tag byte (not yet validated)
    pub tag: u8,
    /// Payload without the tag
    pub payload: Bytes,
}

impl InboundBuffer {
    /// Split the tag byte off a raw inbound buffer
    ///
    /// Fails with `MalformedInput` if the buffer is empty. The tag value is
    /// not validated here.
    pub fn parse(data: Bytes) -> Result<Self> {
        let tag = *data.first().ok_or(Error::MalformedInput)?;

        Ok(Self {
            tag,
            payload: data.slice(TAG_SIZE..),
        })
    }

    /// Build a buffer for a known channel kind
    pub fn new(kind: ChannelKind, payload: Bytes) -> Self {
        Self {
            tag: kind.tag(),
            payload,
        }
    }

    /// Encode back to wire form (tag followed by payload)
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(TAG_SIZE + self.payload.len());
        buf.put_u8(self.tag);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Total size on the wire
    pub fn wire_len(&self) -> usize {
        TAG_SIZE + self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_tag() {
        let data = Bytes::from_static(&[0x01, 0xAA, 0xBB, 0xCC]);
        let buf = InboundBuffer::parse(data.clone()).unwrap();

        assert_eq!(buf.tag, 1);
        assert_eq!(buf.payload, Bytes::from_static(&[0xAA, 0xBB, 0xCC]));
        assert_eq!(buf.payload.len(), data.len() - 1);
    }

    #[test]
    fn test_parse_tag_only() {
        let buf = InboundBuffer::parse(Bytes::from_static(&[0x02])).unwrap();

        assert_eq!(buf.tag, 2);
        assert!(buf.payload.is_empty());
    }

    #[test]
    fn test_parse_empty_is_malformed() {
        assert!(matches!(
            InboundBuffer::parse(Bytes::new()),
            Err(Error::MalformedInput)
        ));
    }

    #[test]
    fn test_parse_keeps_unknown_tag() {
        let buf = InboundBuffer::parse(Bytes::from_static(&[0x07, 0x00])).unwrap();
        assert_eq!(buf.tag, 7);
    }

    #[test]
    fn test_encode() {
        let buf = InboundBuffer::new(ChannelKind::Audio, Bytes::from_static(b"pcm"));

        assert_eq!(buf.encode(), Bytes::from_static(b"\x02pcm"));
        assert_eq!(buf.wire_len(), 4);
    }
}
