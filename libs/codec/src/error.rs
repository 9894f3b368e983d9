//! Decode errors for event payloads

use thiserror::Error;

/// Failure to turn a frame payload into an event.
///
/// Always frame-scoped: the frame is dropped and the pipeline moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload carried no bytes at all
    #[error("Empty payload: an event needs at least one field")]
    Empty,

    /// Payload is not a valid encoding of the event schema
    #[error("Malformed event payload ({len} bytes): {reason}")]
    Malformed { len: usize, reason: String },
}

impl DecodeError {
    pub fn malformed(len: usize, source: prost::DecodeError) -> Self {
        Self::Malformed {
            len,
            reason: source.to_string(),
        }
    }
}
