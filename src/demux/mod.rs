//! Tagged-stream demultiplexing
//!
//! ```text
//!   inbound buffer ──► tag ──► resolve ──► get-or-activate ──► strip tag ──► sink
//!                                               │
//!                                 first use:    ├─ stream start ("video-1")
//!                                               ├─ format descriptor
//!                                               └─ sticky event replay
//!
//!   inbound event ──► segment reset ──► every active channel (dropped if none)
//!                 └─► other         ──► every configured channel
//! ```
//!
//! Processing is synchronous and strictly in arrival order. There is no
//! buffering, reordering or loss recovery.

pub mod config;
pub mod demuxer;
pub mod event;
pub mod fanout;
pub mod frame;

pub use config::{DemuxConfig, FormatDescriptor};
pub use demuxer::{Demuxer, Outputs};
pub use event::{ControlEvent, CustomEvent, Segment};
pub use fanout::FanoutReport;
pub use frame::InboundBuffer;
