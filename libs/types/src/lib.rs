//! # Event Input Types
//!
//! Shared data model for the event input pipeline.
//!
//! ## Design Philosophy
//!
//! - **Opaque Frames**: Payloads travel as [`RawFrame`] (`bytes::Bytes`) until the
//!   decoder touches them, so queue slots never copy
//! - **Pass-Through Fidelity**: A [`DecodedEvent`] keeps the exact bytes it was decoded
//!   from; fields this crate does not model reach the sink unmodified
//! - **Routing Without Re-Parsing**: [`RoutingProperties`] carries the handful of keys
//!   downstream dispatch needs
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{EventRecord, RoutingProperties};
//!
//! let record = EventRecord {
//!     device: "probe-7".to_string(),
//!     network: "dmz".to_string(),
//!     ..Default::default()
//! };
//!
//! let props = RoutingProperties::from_record(&record);
//! assert_eq!(props.device(), Some("probe-7"));
//! assert_eq!(props.network(), Some("dmz"));
//! ```
//!
//! ## Integration Points
//!
//! - **network**: produces [`RawFrame`]s bounded by [`MAX_FRAME_LEN`]
//! - **codec**: turns a [`RawFrame`] into a [`DecodedEvent`]
//! - **message-sink**: receives payload bytes plus [`RoutingProperties`]

pub mod event;
pub mod routing;

pub use event::{DecodedEvent, EventRecord, EventTimeError};
pub use routing::{RoutingProperties, DEVICE_KEY, NETWORK_KEY};

/// One frame payload as read off the wire.
pub type RawFrame = bytes::Bytes;

/// Largest payload a single frame may declare (128 MiB).
pub const MAX_FRAME_LEN: usize = 128 * 1024 * 1024;

/// Size of the big-endian length prefix in front of every frame.
pub const FRAME_HEADER_LEN: usize = 4;
