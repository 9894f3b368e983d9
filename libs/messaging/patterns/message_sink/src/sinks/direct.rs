//! Direct connection sink for TCP and Unix socket peers
//!
//! Each message is wrapped in an [`Envelope`] and written as one length-prefixed
//! frame. The connection is opened lazily on first send and reopened on the next
//! send after a write failure. A failed message is not retried.
//!
//! The outbound frame limit is the input frame limit plus [`ENVELOPE_ALLOWANCE`],
//! so a maximum-size event with ordinary routing fields still fits once wrapped. A message whose
//! envelope exceeds the limit is rejected with [`SinkError::MessageTooLarge`]
//! before anything is written, and the connection stays up.

use crate::config::{ConnectionType, SinkConfig};
use crate::envelope::Envelope;
use crate::{
    ConnectionHealth, ConnectionState, Message, MessageSink, SendContext, SinkError, SinkMetadata,
};
use async_trait::async_trait;
use network::{FrameWriter, FramingError, TcpNetworkConfig, MAX_FRAME_LEN};
use parking_lot::Mutex as SyncMutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::{TcpStream, UnixStream};
use tokio::sync::Mutex;

/// Room for the envelope fields around a maximum-size payload
pub const ENVELOPE_ALLOWANCE: usize = 64 * 1024;

/// Connection wrapper for different protocols
enum Connection {
    Tcp(FrameWriter<TcpStream>),
    Unix(FrameWriter<UnixStream>),
}

impl Connection {
    async fn write_frame(&mut self, payload: &[u8]) -> Result<(), FramingError> {
        match self {
            Connection::Tcp(writer) => writer.write_frame(payload).await,
            Connection::Unix(writer) => writer.write_frame(payload).await,
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connection::Tcp(_) => f.write_str("Connection::Tcp"),
            Connection::Unix(_) => f.write_str("Connection::Unix"),
        }
    }
}

/// Direct connection sink
#[derive(Debug)]
pub struct DirectSink {
    connection: Mutex<Option<Connection>>,
    connection_type: ConnectionType,
    state: SyncMutex<ConnectionState>,
    last_error: SyncMutex<Option<String>>,

    messages_sent: AtomicU64,
    messages_failed: AtomicU64,
    bytes_sent: AtomicU64,
    connection_attempts: AtomicU64,

    /// Sink name for debugging
    name: String,
    connected: AtomicBool,
    connect_timeout: Duration,
    max_frame_len: usize,
}

impl DirectSink {
    pub fn new(connection_type: ConnectionType) -> Self {
        let name = match &connection_type {
            ConnectionType::Tcp(addr) => format!("tcp-{}", addr),
            ConnectionType::Unix(path) => format!("unix-{}", path),
        };

        Self {
            connection: Mutex::new(None),
            connection_type,
            state: SyncMutex::new(ConnectionState::Disconnected),
            last_error: SyncMutex::new(None),
            messages_sent: AtomicU64::new(0),
            messages_failed: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            connection_attempts: AtomicU64::new(0),
            name,
            connected: AtomicBool::new(false),
            connect_timeout: Duration::from_secs(5),
            max_frame_len: MAX_FRAME_LEN + ENVELOPE_ALLOWANCE,
        }
    }

    /// Build from configuration
    pub fn from_config(config: &SinkConfig) -> Result<Self, SinkError> {
        config.validate()?;
        Ok(Self::new(config.connection_type()?).with_timeout(config.connect_timeout()))
    }

    pub fn tcp(address: &str) -> Self {
        Self::new(ConnectionType::Tcp(address.to_string()))
    }

    pub fn unix(path: &str) -> Result<Self, SinkError> {
        if path.is_empty() {
            return Err(SinkError::invalid_config(
                "Unix socket path cannot be empty",
            ));
        }
        Ok(Self::new(ConnectionType::Unix(path.to_string())))
    }

    pub fn connection_type(&self) -> &ConnectionType {
        &self.connection_type
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Override the outbound frame limit
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    pub fn connection_attempts(&self) -> u64 {
        self.connection_attempts.load(Ordering::Relaxed)
    }

    async fn open(&self) -> Result<Connection, SinkError> {
        self.connection_attempts.fetch_add(1, Ordering::Relaxed);
        *self.state.lock() = ConnectionState::Connecting;
        tracing::debug!("Connecting direct sink: {}", self.name);

        let result = match &self.connection_type {
            ConnectionType::Tcp(address) => self.connect_tcp(address).await,
            ConnectionType::Unix(path) => self.connect_unix(path).await,
        };

        match &result {
            Ok(_) => {
                *self.state.lock() = ConnectionState::Connected;
                self.connected.store(true, Ordering::Relaxed);
                tracing::info!("Direct sink connected: {}", self.name);
            }
            Err(e) => {
                *self.state.lock() = ConnectionState::Failed;
                *self.last_error.lock() = Some(e.to_string());
                tracing::error!("Direct sink connection failed: {}", e);
            }
        }
        result
    }

    async fn connect_tcp(&self, address: &str) -> Result<Connection, SinkError> {
        let config = TcpNetworkConfig {
            connect_timeout: self.connect_timeout,
            ..Default::default()
        };

        let stream = match address.parse::<SocketAddr>() {
            Ok(addr) => network::connect(addr, &config)
                .await
                .map_err(|e| SinkError::connection_failed(e.to_string()))?,
            // Hostnames go through the resolver
            Err(_) => {
                let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(address))
                    .await
                    .map_err(|_| SinkError::timeout(self.connect_timeout.as_millis() as u64))?
                    .map_err(|e| {
                        SinkError::connection_failed(format!(
                            "TCP connection to {} failed: {}",
                            address, e
                        ))
                    })?;
                network::configure_stream(&stream, &config);
                stream
            }
        };

        Ok(Connection::Tcp(FrameWriter::with_max_frame_len(
            stream,
            self.max_frame_len,
        )))
    }

    async fn connect_unix(&self, path: &str) -> Result<Connection, SinkError> {
        let stream = tokio::time::timeout(self.connect_timeout, UnixStream::connect(path))
            .await
            .map_err(|_| SinkError::timeout(self.connect_timeout.as_millis() as u64))?
            .map_err(|e| {
                SinkError::connection_failed(format!(
                    "Unix socket connection to {} failed: {}",
                    path, e
                ))
            })?;

        Ok(Connection::Unix(FrameWriter::with_max_frame_len(
            stream,
            self.max_frame_len,
        )))
    }

    fn mark_failed(&self, error: &SinkError) {
        self.messages_failed.fetch_add(1, Ordering::Relaxed);
        self.connected.store(false, Ordering::Relaxed);
        *self.state.lock() = ConnectionState::Failed;
        *self.last_error.lock() = Some(error.to_string());
    }
}

#[async_trait]
impl MessageSink for DirectSink {
    async fn send(&self, message: Message) -> Result<(), SinkError> {
        let frame = Envelope::from_message(&message).encode_bytes();
        if frame.len() > self.max_frame_len {
            // Oversize is a property of the message, not of the socket
            let err = SinkError::message_too_large(frame.len(), self.max_frame_len);
            self.messages_failed.fetch_add(1, Ordering::Relaxed);
            *self.last_error.lock() = Some(err.to_string());
            return Err(err);
        }

        let mut guard = self.connection.lock().await;

        if guard.is_none() {
            match self.open().await {
                Ok(conn) => *guard = Some(conn),
                Err(e) => {
                    self.messages_failed.fetch_add(1, Ordering::Relaxed);
                    return Err(e);
                }
            }
        }

        let Some(conn) = guard.as_mut() else {
            return Err(SinkError::connection_failed("No connection available"));
        };

        match conn.write_frame(&frame).await {
            Ok(()) => {
                self.messages_sent.fetch_add(1, Ordering::Relaxed);
                self.bytes_sent
                    .fetch_add(4 + frame.len() as u64, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                // Connection is unusable; the next send reconnects
                *guard = None;
                let err = SinkError::send_failed_with_context(
                    format!("Failed to write frame: {}", e),
                    SendContext::for_message(&message),
                );
                self.mark_failed(&err);
                Err(err)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn connect(&self) -> Result<(), SinkError> {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SinkError> {
        let mut guard = self.connection.lock().await;
        // Dropping the writer closes the socket
        guard.take();
        self.connected.store(false, Ordering::Relaxed);
        *self.state.lock() = ConnectionState::Disconnected;

        tracing::info!("Direct sink disconnected: {}", self.name);
        Ok(())
    }

    fn metadata(&self) -> SinkMetadata {
        let mut metadata = SinkMetadata::new(self.name.clone(), "direct")
            .with_endpoint(self.connection_type.endpoint())
            .with_state(*self.state.lock())
            .with_counts(
                self.messages_sent.load(Ordering::Relaxed),
                self.messages_failed.load(Ordering::Relaxed),
            );
        metadata.last_error = self.last_error.lock().clone();
        metadata
    }

    fn connection_health(&self) -> ConnectionHealth {
        let metadata = self.metadata();
        match metadata.state {
            ConnectionState::Connected if metadata.error_rate() < 0.05 => ConnectionHealth::Healthy,
            ConnectionState::Connected => ConnectionHealth::Degraded,
            ConnectionState::Failed => ConnectionHealth::Unhealthy,
            _ => ConnectionHealth::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageMetadata;
    use network::FrameReader;
    use tokio::net::TcpListener;
    use types::RoutingProperties;

    fn message(payload: &'static [u8], device: &str) -> Message {
        let mut props = RoutingProperties::new();
        props.insert("device", device);
        props.insert("network", "lan");
        let metadata = MessageMetadata::new()
            .with_target("cyberprobe")
            .with_properties(props);
        Message::with_metadata(payload, metadata).unwrap()
    }

    #[tokio::test]
    async fn test_direct_sink_creation() {
        let tcp_sink = DirectSink::tcp("127.0.0.1:6790");
        assert!(matches!(tcp_sink.connection_type(), ConnectionType::Tcp(_)));
        assert!(!tcp_sink.is_connected());

        let unix_sink = DirectSink::unix("/tmp/test.sock").unwrap();
        assert!(matches!(
            unix_sink.connection_type(),
            ConnectionType::Unix(_)
        ));
        assert!(DirectSink::unix("").is_err());
    }

    #[tokio::test]
    async fn test_from_config() {
        let config = SinkConfig {
            endpoint: "unix:///tmp/events.sock".to_string(),
            connect_timeout_ms: 250,
        };
        let sink = DirectSink::from_config(&config).unwrap();
        assert_eq!(sink.connect_timeout, Duration::from_millis(250));
        assert_eq!(
            sink.metadata().endpoint,
            Some("unix:///tmp/events.sock".to_string())
        );
    }

    #[tokio::test]
    async fn test_sends_envelopes_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let receiver = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = FrameReader::new(stream);
            let mut out = Vec::new();
            while let Some(frame) = reader.read_frame().await.unwrap() {
                out.push(Envelope::decode_bytes(frame).unwrap().into_message());
            }
            out
        });

        let sink = DirectSink::tcp(&addr.to_string());
        sink.send(message(b"one", "d1")).await.unwrap();
        sink.send(message(b"two", "d2")).await.unwrap();
        assert!(sink.is_connected());
        assert_eq!(sink.connection_attempts(), 1);
        sink.disconnect().await.unwrap();

        let received = receiver.await.unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(&received[0].payload[..], b"one");
        assert_eq!(received[0].metadata.target.as_deref(), Some("cyberprobe"));
        assert_eq!(received[1].metadata.properties.device(), Some("d2"));

        let metadata = sink.metadata();
        assert_eq!(metadata.messages_sent, 2);
        assert_eq!(metadata.state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_oversized_envelope_keeps_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let receiver = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = FrameReader::new(stream);
            let mut out = Vec::new();
            while let Some(frame) = reader.read_frame().await.unwrap() {
                out.push(Envelope::decode_bytes(frame).unwrap().payload);
            }
            out
        });

        let sink = DirectSink::tcp(&addr.to_string()).with_max_frame_len(256);
        sink.send(message(b"small", "d1")).await.unwrap();

        let big = Message::with_metadata(vec![0x5a; 512], MessageMetadata::new()).unwrap();
        match sink.send(big).await {
            Err(SinkError::MessageTooLarge { size, limit }) => {
                assert!(size > 512);
                assert_eq!(limit, 256);
            }
            other => panic!("Expected MessageTooLarge, got {:?}", other),
        }
        assert!(sink.is_connected());

        sink.send(message(b"after", "d1")).await.unwrap();
        assert_eq!(sink.connection_attempts(), 1);
        assert_eq!(sink.metadata().messages_failed, 1);
        assert_eq!(sink.metadata().state, ConnectionState::Connected);
        sink.disconnect().await.unwrap();

        let received = receiver.await.unwrap();
        assert_eq!(received, vec![&b"small"[..], &b"after"[..]]);
    }

    #[test]
    fn test_max_frame_event_fits_default_limit() {
        use prost::Message as _;

        let mut props = RoutingProperties::new();
        props.insert("device", "probe-with-a-long-device-name");
        props.insert("network", "corporate-lan");
        let metadata = MessageMetadata::new()
            .with_target("cyberprobe")
            .with_correlation_id("0f8fad5b-d9cb-469f-a165-70867728950e")
            .with_properties(props);
        let message = Message::with_metadata(vec![0u8; MAX_FRAME_LEN], metadata).unwrap();

        let sink = DirectSink::tcp("127.0.0.1:6790");
        let envelope_len = Envelope::from_message(&message).encoded_len();
        assert!(envelope_len > MAX_FRAME_LEN);
        assert!(envelope_len <= sink.max_frame_len());
    }

    #[tokio::test]
    async fn test_connection_failure() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let sink = DirectSink::tcp(&addr.to_string()).with_timeout(Duration::from_secs(1));

        let result = sink.send(message(b"test", "d1")).await;
        assert!(result.is_err());
        assert!(!sink.is_connected());
        assert_eq!(sink.metadata().messages_failed, 1);
        assert_eq!(sink.connection_health(), ConnectionHealth::Unhealthy);
    }
}
