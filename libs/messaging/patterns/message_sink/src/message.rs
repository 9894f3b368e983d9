use bytes::Bytes;
use network::current_timestamp_ns;
use types::{DecodedEvent, RoutingProperties, MAX_FRAME_LEN};

use crate::SinkError;

/// Maximum message size in bytes, matching the input frame limit
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = MAX_FRAME_LEN;

/// Protocol-agnostic message wrapper
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    /// Serialized event, forwarded byte for byte
    pub payload: Bytes,

    /// Routing metadata
    pub metadata: MessageMetadata,
}

impl Message {
    /// Create a new message with payload, validating size
    pub fn new(payload: impl Into<Bytes>) -> Result<Self, SinkError> {
        Self::with_metadata(payload, MessageMetadata::new())
    }

    /// Create a new message with payload and metadata, validating size
    pub fn with_metadata(
        payload: impl Into<Bytes>,
        metadata: MessageMetadata,
    ) -> Result<Self, SinkError> {
        let payload = payload.into();
        if payload.len() > DEFAULT_MAX_MESSAGE_SIZE {
            return Err(SinkError::message_too_large(
                payload.len(),
                DEFAULT_MAX_MESSAGE_SIZE,
            ));
        }

        Ok(Self { payload, metadata })
    }

    /// Create a new message without size validation (for internal use)
    pub fn new_unchecked(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            metadata: MessageMetadata::new(),
        }
    }

    /// Wrap a decoded event: original bytes plus its routing properties.
    ///
    /// The event id becomes the correlation id. Cannot exceed the size limit
    /// because the payload already fit in one frame.
    pub fn from_event(event: &DecodedEvent, properties: RoutingProperties) -> Self {
        let mut metadata = MessageMetadata::new().with_properties(properties);
        if !event.record.id.is_empty() {
            metadata = metadata.with_correlation_id(event.record.id.clone());
        }

        Self {
            payload: event.payload.clone(),
            metadata,
        }
    }

    /// Same message addressed to `target`
    pub fn to_target(&self, target: impl Into<String>) -> Self {
        Self {
            payload: self.payload.clone(),
            metadata: self.metadata.clone().with_target(target),
        }
    }

    /// Get message size in bytes
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageMetadata {
    /// Output topic this message is addressed to
    pub target: Option<String>,

    /// Timestamp when created
    pub timestamp_ns: u64,

    /// Correlation ID for tracing
    pub correlation_id: Option<String>,

    /// Routing keys derived from the event (`device`, `network`)
    pub properties: RoutingProperties,
}

impl MessageMetadata {
    pub fn new() -> Self {
        Self {
            target: None,
            timestamp_ns: current_timestamp_ns(),
            correlation_id: None,
            properties: RoutingProperties::new(),
        }
    }

    /// Set target topic
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set correlation ID
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Replace routing properties
    pub fn with_properties(mut self, properties: RoutingProperties) -> Self {
        self.properties = properties;
        self
    }
}
