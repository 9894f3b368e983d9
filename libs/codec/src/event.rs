//! Event payload decoding

use bytes::Bytes;
use prost::Message;
use tracing::trace;
use types::{DecodedEvent, EventRecord, RawFrame};

use crate::error::DecodeError;

/// Decode one frame payload.
///
/// The returned event keeps a handle on `frame` (no copy), so the bytes forwarded
/// downstream are exactly the bytes received.
pub fn decode(frame: RawFrame) -> Result<DecodedEvent, DecodeError> {
    if frame.is_empty() {
        return Err(DecodeError::Empty);
    }

    let len = frame.len();
    let record = EventRecord::decode(frame.clone()).map_err(|e| DecodeError::malformed(len, e))?;

    trace!(
        bytes = len,
        device = %record.device,
        network = %record.network,
        "Decoded event"
    );

    Ok(DecodedEvent::new(record, frame))
}

/// Serialize a record into a frame payload.
pub fn encode_record(record: &EventRecord) -> Bytes {
    Bytes::from(record.encode_to_vec())
}
