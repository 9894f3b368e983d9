//! # Event Codec
//!
//! ## Purpose
//!
//! The "Rules" layer of the input pipeline: turns one opaque frame payload into a
//! [`DecodedEvent`] and back.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → services/adapters
//!     ↑           ↓              ↓
//! Pure Data   Decode/Encode   Publisher
//! EventRecord DecodeError     MessageSink
//! ```
//!
//! ## What This Crate Contains
//! - [`decode`]: pure decoding of a frame payload, never panics on hostile input
//! - [`encode_record`]: the inverse, used by probes, tools and tests
//! - [`DecodeError`]: frame-scoped failure; callers log and drop the frame
//!
//! ## What This Crate Does NOT Contain
//! - Length-prefix framing (belongs in network/)
//! - Socket management or connection handling
//! - Publishing or metrics

pub mod error;
pub mod event;

pub use error::DecodeError;
pub use event::{decode, encode_record};
