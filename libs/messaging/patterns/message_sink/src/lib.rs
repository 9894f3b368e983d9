pub mod config;
pub mod envelope;
pub mod error;
pub mod message;
pub mod metadata;
pub mod sinks;
pub mod test_utils;

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

pub use config::{ConnectionType, SinkConfig};
pub use envelope::Envelope;
pub use error::{SendContext, SinkError};
pub use message::{Message, MessageMetadata, DEFAULT_MAX_MESSAGE_SIZE};
pub use metadata::{ConnectionHealth, ConnectionState, SinkMetadata};
pub use sinks::{DirectSink, ENVELOPE_ALLOWANCE};

/// A destination for published events that abstracts away connection details.
///
/// Delivery guarantees (ordering, retries, acknowledgement) belong to the
/// implementation. Callers make one `send` per message and do not retry.
#[async_trait]
pub trait MessageSink: Send + Sync + Debug {
    /// Send a single message
    async fn send(&self, message: Message) -> Result<(), SinkError>;

    /// Check if currently connected
    fn is_connected(&self) -> bool;

    /// Establish connection (may be no-op if already connected)
    async fn connect(&self) -> Result<(), SinkError>;

    /// Close connection (may be no-op if not connected)
    async fn disconnect(&self) -> Result<(), SinkError>;

    /// Counters and state for the stats log
    fn metadata(&self) -> SinkMetadata {
        SinkMetadata::default()
    }

    /// Health verdict for the stats log
    fn connection_health(&self) -> ConnectionHealth {
        ConnectionHealth::Unknown
    }
}

#[async_trait]
impl<T: MessageSink + ?Sized> MessageSink for Arc<T> {
    async fn send(&self, message: Message) -> Result<(), SinkError> {
        (**self).send(message).await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    async fn connect(&self) -> Result<(), SinkError> {
        (**self).connect().await
    }

    async fn disconnect(&self) -> Result<(), SinkError> {
        (**self).disconnect().await
    }

    fn metadata(&self) -> SinkMetadata {
        (**self).metadata()
    }

    fn connection_health(&self) -> ConnectionHealth {
        (**self).connection_health()
    }
}
