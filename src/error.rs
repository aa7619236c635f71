//! Error types
//!
//! Per-buffer and per-event failures surfaced by the demuxer. None of these
//! is fatal to the demuxer itself; it stays usable after any single failure.

use crate::registry::ChannelKind;
use crate::sink::SinkError;

/// Result type alias for demuxer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for demuxer operations
#[derive(Debug)]
pub enum Error {
    /// Buffer too short to carry a tag byte
    MalformedInput,
    /// Tag byte outside the known channel kinds
    UnsupportedType(u8),
    /// Downstream sink rejected the initial configuration of a channel
    ActivationFailure {
        kind: ChannelKind,
        source: SinkError,
    },
    /// Downstream sink rejected a buffer or event after activation
    ForwardFailure {
        kind: ChannelKind,
        source: SinkError,
    },
    /// Socket error in the UDP ingress
    Io(std::io::Error),
}

impl Error {
    /// Whether this is a per-buffer rejection (the buffer never reached a channel)
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::MalformedInput | Error::UnsupportedType(_))
    }

    /// Channel the failure is attributed to, if any
    pub fn kind(&self) -> Option<ChannelKind> {
        match self {
            Error::ActivationFailure { kind, .. } | Error::ForwardFailure { kind, .. } => {
                Some(*kind)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MalformedInput => write!(f, "Malformed input: buffer has no type tag"),
            Error::UnsupportedType(tag) => write!(f, "Unsupported buffer type: {}", tag),
            Error::ActivationFailure { kind, source } => {
                write!(f, "Failed to activate {} channel: {}", kind, source)
            }
            Error::ForwardFailure { kind, source } => {
                write!(f, "Failed to forward to {} channel: {}", kind, source)
            }
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ActivationFailure { source, .. } | Error::ForwardFailure { source, .. } => {
                Some(source)
            }
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
