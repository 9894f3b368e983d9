//! Concrete MessageSink implementations
//!
//! - **DirectSink**: framed envelopes over TCP or a Unix socket

pub mod direct;

pub use direct::{DirectSink, ENVELOPE_ALLOWANCE};
