//! In-memory sinks for exercising publishers without a downstream peer.

use crate::{ConnectionHealth, ConnectionState, Message, MessageSink, SendContext, SinkError, SinkMetadata};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{watch, Notify};

/// A sink that just collects messages for testing with bounded storage
#[derive(Debug)]
pub struct CollectorSink {
    /// Bounded message queue to prevent memory leaks
    messages: Mutex<VecDeque<Message>>,
    max_messages: usize,
    connected: AtomicBool,
    fail_on_send: AtomicBool,
    messages_sent: AtomicU64,
    messages_failed: AtomicU64,
    name: String,
    arrived: Notify,
}

impl CollectorSink {
    /// Create a connected collector with default capacity
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(max_messages: usize) -> Self {
        Self {
            messages: Mutex::new(VecDeque::with_capacity(max_messages.min(1024))),
            max_messages,
            connected: AtomicBool::new(true),
            fail_on_send: AtomicBool::new(false),
            messages_sent: AtomicU64::new(0),
            messages_failed: AtomicU64::new(0),
            name: "test-collector".to_string(),
            arrived: Notify::new(),
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        let mut sink = Self::new();
        sink.name = name.into();
        sink
    }

    /// Get all received messages
    pub fn received_messages(&self) -> Vec<Message> {
        self.messages.lock().iter().cloned().collect()
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }

    /// Payloads in arrival order
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.messages.lock().iter().map(|m| m.payload.to_vec()).collect()
    }

    /// Wait until at least `count` messages arrived, or `timeout` elapsed.
    /// Returns whether the count was reached.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.arrived.notified();
            if self.message_count() >= count {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.message_count() >= count;
            }
        }
    }

    /// Configure to fail on next send
    pub fn fail_next_send(&self) {
        self.fail_on_send.store(true, Ordering::Relaxed);
    }

    pub fn force_disconnect(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    fn reject(&self, message: &Message, reason: &str) -> SinkError {
        self.messages_failed.fetch_add(1, Ordering::Relaxed);
        SinkError::send_failed_with_context(reason, SendContext::for_message(message))
    }
}

impl Default for CollectorSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSink for CollectorSink {
    async fn send(&self, message: Message) -> Result<(), SinkError> {
        if !self.is_connected() {
            return Err(self.reject(&message, "Not connected"));
        }
        if self.fail_on_send.swap(false, Ordering::Relaxed) {
            return Err(self.reject(&message, "Simulated failure"));
        }

        {
            let mut messages = self.messages.lock();
            if messages.len() >= self.max_messages {
                messages.pop_front(); // Drop oldest message
            }
            messages.push_back(message);
        }

        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.arrived.notify_waiters();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn connect(&self) -> Result<(), SinkError> {
        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SinkError> {
        self.connected.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn metadata(&self) -> SinkMetadata {
        SinkMetadata::new(self.name.clone(), "collector")
            .with_endpoint("memory://test")
            .with_state(if self.is_connected() {
                ConnectionState::Connected
            } else {
                ConnectionState::Disconnected
            })
            .with_counts(
                self.messages_sent.load(Ordering::Relaxed),
                self.messages_failed.load(Ordering::Relaxed),
            )
    }

    fn connection_health(&self) -> ConnectionHealth {
        if self.is_connected() {
            ConnectionHealth::Healthy
        } else {
            ConnectionHealth::Unknown
        }
    }
}

/// A sink that always fails for testing error conditions
#[derive(Debug)]
pub struct FailingSink {
    error_message: String,
    attempts: AtomicU64,
}

impl FailingSink {
    pub fn new(error_message: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
            attempts: AtomicU64::new(0),
        }
    }

    /// Number of send calls received
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

impl Default for FailingSink {
    fn default() -> Self {
        Self::new("Simulated failure")
    }
}

#[async_trait]
impl MessageSink for FailingSink {
    async fn send(&self, message: Message) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        Err(SinkError::send_failed_with_context(
            &self.error_message,
            SendContext::for_message(&message),
        ))
    }

    fn is_connected(&self) -> bool {
        false
    }

    async fn connect(&self) -> Result<(), SinkError> {
        Err(SinkError::connection_failed(&self.error_message))
    }

    async fn disconnect(&self) -> Result<(), SinkError> {
        Ok(())
    }

    fn metadata(&self) -> SinkMetadata {
        let mut metadata = SinkMetadata::new("failing-sink", "test-failing")
            .with_state(ConnectionState::Failed)
            .with_counts(0, self.attempts());
        metadata.last_error = Some(self.error_message.clone());
        metadata
    }

    fn connection_health(&self) -> ConnectionHealth {
        ConnectionHealth::Unhealthy
    }
}

/// A collector whose `send` blocks until the gate is opened.
///
/// Stands in for a stalled downstream when testing backpressure.
#[derive(Debug)]
pub struct GatedSink {
    inner: CollectorSink,
    gate: watch::Sender<bool>,
    blocked: AtomicUsize,
}

impl GatedSink {
    /// Create with the gate closed
    pub fn closed() -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            inner: CollectorSink::new(),
            gate,
            blocked: AtomicUsize::new(0),
        }
    }

    pub fn open(&self) {
        self.gate.send_replace(true);
    }

    pub fn close(&self) {
        self.gate.send_replace(false);
    }

    /// Sends currently waiting on the gate
    pub fn blocked_sends(&self) -> usize {
        self.blocked.load(Ordering::SeqCst)
    }

    pub fn collector(&self) -> &CollectorSink {
        &self.inner
    }
}

#[async_trait]
impl MessageSink for GatedSink {
    async fn send(&self, message: Message) -> Result<(), SinkError> {
        let mut gate = self.gate.subscribe();
        self.blocked.fetch_add(1, Ordering::SeqCst);
        let opened = gate.wait_for(|open| *open).await.is_ok();
        self.blocked.fetch_sub(1, Ordering::SeqCst);

        if !opened {
            return Err(SinkError::Closed);
        }
        self.inner.send(message).await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    async fn connect(&self) -> Result<(), SinkError> {
        self.inner.connect().await
    }

    async fn disconnect(&self) -> Result<(), SinkError> {
        self.inner.disconnect().await
    }

    fn metadata(&self) -> SinkMetadata {
        let mut metadata = self.inner.metadata();
        metadata.sink_type = "gated".to_string();
        metadata
    }
}
