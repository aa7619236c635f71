//! Channel registry for tag-based routing
//!
//! The registry owns the three logical output channels and their activation
//! lifecycle. Channels are created lazily, the first time a buffer of their
//! kind is routed.
//!
//! # Architecture
//!
//! ```text
//!                        ChannelRegistry
//!                  ┌──────────────────────────┐
//!                  │ Mutex<                   │
//!                  │   channels: [Option<     │
//!                  │     Channel { state,     │
//!                  │       format, .. }>; 3], │
//!                  │   formats,               │
//!                  │   sticky events,         │
//!                  │ >                        │
//!                  └────────────┬─────────────┘
//!                               │
//!      tag 0 ───────────────────┼─────────────────── tag 2
//!         │                     │                     │
//!         ▼                     ▼                     ▼
//!     [control]              [video]              [audio]
//!  Inactive → Activating → Active (terminal until teardown)
//! ```

pub mod entry;
pub mod kind;
pub mod sticky;
pub mod store;

pub use entry::{Channel, ChannelState};
pub use kind::ChannelKind;
pub use sticky::StickyEvents;
pub use store::{Activation, ActivationPlan, ChannelRegistry};
