//! Bounded hand-off between connection readers and the publisher.
//!
//! Many producers, one consumer, strict FIFO. A full queue parks the producer,
//! which in turn stops reading its socket; that is the only backpressure point
//! on the ingest path. The queue closes once every [`IngestSender`] is dropped
//! and the remaining frames have been dequeued.

use tokio::sync::mpsc;
use types::RawFrame;

/// Factory for the two halves of the ingest queue
pub struct IngestQueue;

impl IngestQueue {
    /// Create a queue holding at most `capacity` frames
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0. Configuration validation rejects that value.
    pub fn bounded(capacity: usize) -> (IngestSender, IngestReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            IngestSender { tx },
            IngestReceiver { rx, capacity },
        )
    }
}

/// Producer half, cloned once per connection
#[derive(Debug, Clone)]
pub struct IngestSender {
    tx: mpsc::Sender<RawFrame>,
}

impl IngestSender {
    /// Append a frame, waiting while the queue is full.
    ///
    /// Fails, handing the frame back, only when the consumer is gone.
    pub async fn enqueue(&self, frame: RawFrame) -> Result<(), RawFrame> {
        self.tx.send(frame).await.map_err(|e| e.0)
    }

    /// Free slots right now
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, owned by the publisher
#[derive(Debug)]
pub struct IngestReceiver {
    rx: mpsc::Receiver<RawFrame>,
    capacity: usize,
}

impl IngestReceiver {
    /// Next frame in arrival order; `None` once closed and drained
    pub async fn dequeue(&mut self) -> Option<RawFrame> {
        self.rx.recv().await
    }

    /// Frames currently buffered
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stop accepting new frames; buffered frames remain dequeueable
    pub fn close(&mut self) {
        self.rx.close();
    }
}
