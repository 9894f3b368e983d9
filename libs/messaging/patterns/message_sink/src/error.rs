/// Context information for send operations to aid in debugging
#[derive(Debug, Clone)]
pub struct SendContext {
    /// Size of the message payload in bytes
    pub message_size: usize,
    /// Correlation ID for tracing, if available
    pub correlation_id: Option<String>,
    /// Timestamp when send was attempted (nanoseconds since epoch)
    pub timestamp_ns: u64,
    /// Output topic, if available
    pub target: Option<String>,
}

impl SendContext {
    /// Context for sending `message` right now
    pub fn for_message(message: &crate::Message) -> Self {
        Self {
            message_size: message.size(),
            correlation_id: message.metadata.correlation_id.clone(),
            timestamp_ns: network::current_timestamp_ns(),
            target: message.metadata.target.clone(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SinkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {error} (size: {size}B, id: {correlation_id:?}, target: {target:?})",
            size = context.message_size,
            correlation_id = context.correlation_id,
            target = context.target)]
    SendFailed { error: String, context: SendContext },

    #[error("Message too large: {size}B exceeds limit of {limit}B")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("Sink closed")]
    Closed,

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl SinkError {
    /// Create a connection failed error
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        SinkError::ConnectionFailed(msg.into())
    }

    /// Create a send failed error with context
    pub fn send_failed_with_context(msg: impl Into<String>, context: SendContext) -> Self {
        SinkError::SendFailed {
            error: msg.into(),
            context,
        }
    }

    /// Create a message too large error
    pub fn message_too_large(size: usize, limit: usize) -> Self {
        SinkError::MessageTooLarge { size, limit }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        SinkError::InvalidConfig(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(millis: u64) -> Self {
        SinkError::Timeout(millis)
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err.to_string())
    }
}
