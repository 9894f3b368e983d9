//! Error types for the input adapter service

use network::TransportError;
use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Main error type for service-level operations
///
/// Per-frame and per-connection failures never surface here; they are logged
/// where they happen and the pipeline keeps going. What remains are the
/// failures that stop the service from starting or running at all.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Listener could not be bound
    #[error("Failed to bind listener on {address}: {source}")]
    Bind {
        /// Address that was requested
        address: String,
        /// Underlying transport failure
        #[source]
        source: TransportError,
    },

    /// Configuration error in adapter settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Metric registration failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// I/O error while loading files or talking to the OS
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdapterError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
