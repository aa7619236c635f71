//! Demuxer configuration

use bytes::Bytes;

use crate::registry::ChannelKind;

/// Opaque output format descriptor (e.g. a media-type string)
///
/// Applied to a channel's output once, when the channel activates. The
/// demuxer never interprets the contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormatDescriptor(Bytes);

impl FormatDescriptor {
    /// Wrap raw descriptor bytes
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    /// Raw descriptor bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Descriptor as shared bytes
    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }

    /// Descriptor as text, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&'static str> for FormatDescriptor {
    fn from(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for FormatDescriptor {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl From<Vec<u8>> for FormatDescriptor {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}

impl From<Bytes> for FormatDescriptor {
    fn from(b: Bytes) -> Self {
        Self(b)
    }
}

impl std::fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Demuxer configuration options
#[derive(Debug, Clone)]
pub struct DemuxConfig {
    /// Per-kind format descriptors, indexed by `ChannelKind::index`
    pub formats: [Option<FormatDescriptor>; ChannelKind::COUNT],

    /// Replay remembered sticky events to channels on activation
    pub replay_sticky_events: bool,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            formats: [None, None, None],
            replay_sticky_events: true,
        }
    }
}

impl DemuxConfig {
    /// Set the format descriptor for a channel kind
    pub fn format(mut self, kind: ChannelKind, format: impl Into<FormatDescriptor>) -> Self {
        self.formats[kind.index()] = Some(format.into());
        self
    }

    /// Set the control channel format descriptor
    pub fn control_format(self, format: impl Into<FormatDescriptor>) -> Self {
        self.format(ChannelKind::Control, format)
    }

    /// Set the video channel format descriptor
    pub fn video_format(self, format: impl Into<FormatDescriptor>) -> Self {
        self.format(ChannelKind::Video, format)
    }

    /// Set the audio channel format descriptor
    pub fn audio_format(self, format: impl Into<FormatDescriptor>) -> Self {
        self.format(ChannelKind::Audio, format)
    }

    /// Do not replay sticky events to late-activating channels
    pub fn disable_sticky_replay(mut self) -> Self {
        self.replay_sticky_events = false;
        self
    }

    /// Get the configured format descriptor for a kind
    pub fn format_for(&self, kind: ChannelKind) -> Option<&FormatDescriptor> {
        self.formats[kind.index()].as_ref()
    }
}
