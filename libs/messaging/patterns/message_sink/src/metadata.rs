//! Point-in-time views of a sink, read by the service's stats reporter.

/// Counters and connection state of one sink
#[derive(Debug, Clone, Default)]
pub struct SinkMetadata {
    pub name: String,
    /// Implementation label: `direct`, `collector`, ...
    pub sink_type: String,
    /// Peer address in endpoint form, when the sink has one
    pub endpoint: Option<String>,
    pub state: ConnectionState,
    pub messages_sent: u64,
    pub messages_failed: u64,
    pub last_error: Option<String>,
}

impl SinkMetadata {
    pub fn new(name: impl Into<String>, sink_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sink_type: sink_type.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_state(mut self, state: ConnectionState) -> Self {
        self.state = state;
        self
    }

    pub fn with_counts(mut self, sent: u64, failed: u64) -> Self {
        self.messages_sent = sent;
        self.messages_failed = failed;
        self
    }

    /// Fraction of failed sends, `0.0` before any send
    pub fn error_rate(&self) -> f64 {
        match self.messages_sent + self.messages_failed {
            0 => 0.0,
            total => self.messages_failed as f64 / total as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// Coarse health verdict derived from state and error rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionHealth {
    Healthy,
    /// Connected but failing some sends
    Degraded,
    Unhealthy,
    #[default]
    Unknown,
}

impl ConnectionHealth {
    /// Worth a warning in the stats log
    pub fn needs_attention(&self) -> bool {
        matches!(self, ConnectionHealth::Degraded | ConnectionHealth::Unhealthy)
    }
}
