//! Channel kinds and tag resolution
//!
//! Every inbound buffer starts with a one-byte type tag:
//!
//! ```text
//! +--------+------------------+
//! | Tag(1) | Payload(N)       |
//! +--------+------------------+
//!   0 = control
//!   1 = video
//!   2 = audio
//! ```

/// Logical output channel of the demuxer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelKind {
    /// Control messages (e.g. RTCP)
    Control = 0,
    /// Video payloads
    Video = 1,
    /// Audio payloads
    Audio = 2,
}

impl ChannelKind {
    /// All kinds, in tag order
    pub const ALL: [ChannelKind; 3] = [ChannelKind::Control, ChannelKind::Video, ChannelKind::Audio];

    /// Number of channel kinds
    pub const COUNT: usize = 3;

    /// Resolve a tag byte, returning `None` for unknown tags
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ChannelKind::Control),
            1 => Some(ChannelKind::Video),
            2 => Some(ChannelKind::Audio),
            _ => None,
        }
    }

    /// Tag byte carried by buffers for this kind
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Slot index in fixed-size per-kind tables
    pub fn index(self) -> usize {
        self as usize
    }

    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            ChannelKind::Control => "control",
            ChannelKind::Video => "video",
            ChannelKind::Audio => "audio",
        }
    }

    /// Stream identifier announced when this channel activates
    ///
    /// Deterministic per kind: `control-0`, `video-1`, `audio-2`.
    pub fn stream_id(self) -> String {
        format!("{}-{}", self.name(), self.tag())
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}
