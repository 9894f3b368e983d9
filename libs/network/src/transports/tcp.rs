//! TCP Network Transport
//!
//! Listener binding, poll-bounded accept and outbound connect for framed TCP
//! streams. Framing itself lives in [`crate::framing`].

use crate::{Result, TransportError};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// TCP network transport configuration
#[derive(Debug, Clone)]
pub struct TcpNetworkConfig {
    /// Connection timeout for outbound connects
    pub connect_timeout: Duration,
    /// Disable Nagle on every stream
    pub nodelay: bool,
}

impl Default for TcpNetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(crate::DEFAULT_CONNECTION_TIMEOUT_SECS),
            nodelay: true,
        }
    }
}

/// Result of one bounded wait on the listener.
#[derive(Debug)]
pub enum AcceptOutcome {
    Accepted(TcpStream, SocketAddr),
    /// Nothing arrived within the poll interval
    TimedOut,
    /// Listener reported an error; the listener itself is still usable
    Failed(std::io::Error),
}

/// Bind a listener, failing with [`TransportError::Bind`] when the address is unavailable.
pub async fn bind_listener(address: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(address)
        .await
        .map_err(|e| TransportError::bind(address, e))?;

    let local = listener.local_addr().unwrap_or(address);
    info!("TCP server listening on {}", local);
    Ok(listener)
}

/// Wait at most `poll_interval` for one inbound connection.
pub async fn accept_with_timeout(listener: &TcpListener, poll_interval: Duration) -> AcceptOutcome {
    match tokio::time::timeout(poll_interval, listener.accept()).await {
        Ok(Ok((stream, peer))) => AcceptOutcome::Accepted(stream, peer),
        Ok(Err(e)) => AcceptOutcome::Failed(e),
        Err(_) => AcceptOutcome::TimedOut,
    }
}

/// Apply per-stream socket options. Failures are logged, never fatal.
pub fn configure_stream(stream: &TcpStream, config: &TcpNetworkConfig) {
    if config.nodelay {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }
    }
}

/// Connect to a remote peer with the configured timeout.
pub async fn connect(remote_addr: SocketAddr, config: &TcpNetworkConfig) -> Result<TcpStream> {
    debug!("Connecting to TCP peer at {}", remote_addr);

    let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(remote_addr))
        .await
        .map_err(|_| {
            TransportError::timeout("TCP connect", config.connect_timeout.as_millis() as u64)
        })?
        .map_err(|e| {
            TransportError::connection_with_source(
                "Failed to connect to TCP peer",
                Some(remote_addr),
                e,
            )
        })?;

    configure_stream(&stream, config);
    info!("Successfully connected to TCP peer at {}", remote_addr);
    Ok(stream)
}
