//! Per-connection frame reader
//!
//! Reads length-prefixed frames off one accepted socket and hands each complete
//! frame to the ingest queue. A framing violation ends this connection only.

use network::{FrameReader, FramingError};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, BufReader};
use tracing::{debug, warn};

use crate::metrics::InputMetrics;
use crate::queue::IngestSender;

/// Why a connection stopped being read
#[derive(Debug)]
pub enum ConnectionEnd {
    /// Peer closed the stream on a frame boundary
    Eof,
    /// Peer sent something that is not a valid frame, or the socket failed
    Framing(FramingError),
    /// Publisher is gone; the frame that could not be queued is lost
    QueueClosed,
}

impl ConnectionEnd {
    pub fn is_clean(&self) -> bool {
        matches!(self, ConnectionEnd::Eof)
    }
}

/// Shared state every connection reader needs
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub queue: IngestSender,
    pub metrics: InputMetrics,
    pub max_frame_len: usize,
}

impl ConnectionContext {
    pub fn new(queue: IngestSender, metrics: InputMetrics, max_frame_len: usize) -> Self {
        Self {
            queue,
            metrics,
            max_frame_len,
        }
    }

    /// Read frames from `stream` until it ends, queueing each one.
    ///
    /// The received counter moves before the enqueue, so a frame waiting on a
    /// full queue is already counted.
    pub async fn run<R>(&self, stream: R, peer: SocketAddr) -> ConnectionEnd
    where
        R: AsyncRead + Unpin,
    {
        let stream = BufReader::new(stream);
        let mut reader = FrameReader::with_max_frame_len(stream, self.max_frame_len);
        debug!(peer = %peer, "Connection opened");

        let end = loop {
            match reader.read_frame().await {
                Ok(Some(frame)) => {
                    self.metrics.received.inc();
                    if self.queue.enqueue(frame).await.is_err() {
                        break ConnectionEnd::QueueClosed;
                    }
                }
                Ok(None) => break ConnectionEnd::Eof,
                Err(e) => break ConnectionEnd::Framing(e),
            }
        };

        match &end {
            ConnectionEnd::Eof => {}
            ConnectionEnd::Framing(e) => {
                warn!(peer = %peer, kind = e.category(), error = %e, "Closing connection")
            }
            ConnectionEnd::QueueClosed => {
                warn!(peer = %peer, "Ingest queue closed, dropping connection")
            }
        }
        debug!(
            peer = %peer,
            frames = reader.frames_read(),
            bytes = reader.bytes_read(),
            "Connection closed"
        );
        end
    }
}
