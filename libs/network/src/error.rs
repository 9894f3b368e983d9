//! Transport Error Types
//!
//! Error handling for the wire framing layer and for TCP listener/connector
//! setup. Framing errors are always scoped to one connection.

use std::net::SocketAddr;
use thiserror::Error;

/// Violation of the length-prefixed framing on one connection.
///
/// Every variant ends the connection it occurred on and nothing else.
#[derive(Error, Debug)]
pub enum FramingError {
    /// Stream ended part way through a 4-byte length prefix
    #[error("Truncated frame header: stream closed after {received} of 4 bytes")]
    TruncatedHeader { received: usize },

    /// Length prefix declared an empty frame
    #[error("Zero-length frame is not valid")]
    ZeroLength,

    /// Length prefix declared more than the frame limit
    #[error("Oversized PDU: declared {declared} bytes exceeds maximum {max}")]
    Oversized { declared: usize, max: usize },

    /// Stream ended part way through a payload
    #[error("Truncated frame payload: expected {expected} bytes, received {received}")]
    TruncatedPayload { expected: usize, received: usize },

    /// Any other I/O failure while reading or writing a frame
    #[error("Frame I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl FramingError {
    /// Short label for logs and metrics
    pub fn category(&self) -> &'static str {
        match self {
            FramingError::TruncatedHeader { .. } => "truncated_header",
            FramingError::ZeroLength => "zero_length",
            FramingError::Oversized { .. } => "oversized",
            FramingError::TruncatedPayload { .. } => "truncated_payload",
            FramingError::Io { .. } => "io",
        }
    }
}

/// Main transport error type
#[derive(Error, Debug)]
pub enum TransportError {
    /// Listener could not be created on the requested address
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        source: std::io::Error,
    },

    /// Connection management errors
    #[error("Connection error: {message} (remote: {remote_addr:?})")]
    Connection {
        message: String,
        remote_addr: Option<SocketAddr>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transport timeout errors
    #[error("Timeout error: {operation} exceeded {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

impl TransportError {
    /// Create a bind error
    pub fn bind(address: SocketAddr, source: std::io::Error) -> Self {
        Self::Bind { address, source }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        remote_addr: Option<SocketAddr>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            remote_addr,
            source: Some(Box::new(source)),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}
