//! Wire envelope written by [`DirectSink`](crate::DirectSink).
//!
//! One envelope per frame, using the same 4-byte length prefix as the input
//! side. The event itself rides untouched in `payload`.

use bytes::Bytes;
use prost::Message as _;
use std::collections::BTreeMap;

use crate::{Message, MessageMetadata, SinkError};

#[derive(Clone, PartialEq, prost::Message)]
pub struct Envelope {
    /// Output topic
    #[prost(string, tag = "1")]
    pub target: String,
    #[prost(btree_map = "string, string", tag = "2")]
    pub properties: BTreeMap<String, String>,
    /// Serialized event
    #[prost(bytes = "bytes", tag = "3")]
    pub payload: Bytes,
    #[prost(uint64, tag = "4")]
    pub timestamp_ns: u64,
    #[prost(string, tag = "5")]
    pub correlation_id: String,
}

impl Envelope {
    pub fn from_message(message: &Message) -> Self {
        let meta = &message.metadata;
        Self {
            target: meta.target.clone().unwrap_or_default(),
            properties: meta
                .properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            payload: message.payload.clone(),
            timestamp_ns: meta.timestamp_ns,
            correlation_id: meta.correlation_id.clone().unwrap_or_default(),
        }
    }

    pub fn encode_bytes(&self) -> Bytes {
        Bytes::from(self.encode_to_vec())
    }

    pub fn decode_bytes(frame: Bytes) -> Result<Self, SinkError> {
        Self::decode(frame).map_err(|e| SinkError::Io(format!("Invalid envelope: {}", e)))
    }

    pub fn into_message(self) -> Message {
        let metadata = MessageMetadata {
            target: (!self.target.is_empty()).then_some(self.target),
            timestamp_ns: self.timestamp_ns,
            correlation_id: (!self.correlation_id.is_empty()).then_some(self.correlation_id),
            properties: self.properties.into(),
        };
        Message {
            payload: self.payload,
            metadata,
        }
    }
}
