//! Prometheus metrics for the ingest pipeline.
//!
//! Each service instance owns its own [`Registry`], so tests can run several
//! services side by side without colliding on metric names.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder,
};
use message_sink::{ConnectionHealth, MessageSink};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::Result;

/// Latency buckets in seconds, 1ms to ~1min
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

#[derive(Debug, Clone)]
pub struct InputMetrics {
    registry: Registry,
    /// Seconds between an event's origination time and its decode
    pub event_latency: Histogram,
    /// Frames fully read off a connection
    pub received: IntCounter,
    pub decode_errors: IntCounter,
    pub published: IntCounter,
    pub publish_failures: IntCounter,
    /// Connections currently open
    pub connections: IntGauge,
    pub connections_rejected: IntCounter,
}

impl InputMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let event_latency = Histogram::with_opts(
            HistogramOpts::new("input_event_latency", "Latency from probe to input")
                .buckets(LATENCY_BUCKETS.to_vec()),
        )?;
        let received = IntCounter::with_opts(Opts::new(
            "input_received",
            "Frames received from probes",
        ))?;
        let decode_errors = IntCounter::with_opts(Opts::new(
            "input_decode_errors",
            "Payloads dropped because they did not decode",
        ))?;
        let published = IntCounter::with_opts(Opts::new(
            "input_published",
            "Messages accepted by the sink",
        ))?;
        let publish_failures = IntCounter::with_opts(Opts::new(
            "input_publish_failures",
            "Messages the sink refused",
        ))?;
        let connections =
            IntGauge::with_opts(Opts::new("input_connections", "Open probe connections"))?;
        let connections_rejected = IntCounter::with_opts(Opts::new(
            "input_connections_rejected",
            "Connections closed because the connection limit was reached",
        ))?;

        registry.register(Box::new(event_latency.clone()))?;
        registry.register(Box::new(received.clone()))?;
        registry.register(Box::new(decode_errors.clone()))?;
        registry.register(Box::new(published.clone()))?;
        registry.register(Box::new(publish_failures.clone()))?;
        registry.register(Box::new(connections.clone()))?;
        registry.register(Box::new(connections_rejected.clone()))?;

        Ok(Self {
            registry,
            event_latency,
            received,
            decode_errors,
            published,
            publish_failures,
            connections,
            connections_rejected,
        })
    }

    pub fn observe_latency(&self, latency: Duration) {
        self.event_latency.observe(latency.as_secs_f64());
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every metric in the Prometheus text exposition format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received.get(),
            decode_errors: self.decode_errors.get(),
            published: self.published.get(),
            publish_failures: self.publish_failures.get(),
            connections: self.connections.get(),
            connections_rejected: self.connections_rejected.get(),
            latency_samples: self.event_latency.get_sample_count(),
            latency_sum_seconds: self.event_latency.get_sample_sum(),
        }
    }

    /// Log one stats line for the pipeline and one for the sink.
    ///
    /// The sink line is a warning when its health needs attention.
    pub fn report(&self, service: &str, sink: &dyn MessageSink) -> ConnectionHealth {
        let s = self.snapshot();
        info!(
            service = %service,
            received = s.received,
            published = s.published,
            decode_errors = s.decode_errors,
            publish_failures = s.publish_failures,
            connections = s.connections,
            rejected = s.connections_rejected,
            mean_latency_ms = s.mean_latency_ms(),
            "Pipeline stats"
        );

        let health = sink.connection_health();
        let meta = sink.metadata();
        if health.needs_attention() {
            warn!(
                sink = %meta.name,
                endpoint = ?meta.endpoint,
                state = ?meta.state,
                health = ?health,
                sent = meta.messages_sent,
                failed = meta.messages_failed,
                last_error = ?meta.last_error,
                "Sink unhealthy"
            );
        } else {
            info!(
                sink = %meta.name,
                state = ?meta.state,
                health = ?health,
                sent = meta.messages_sent,
                failed = meta.messages_failed,
                "Sink stats"
            );
        }
        health
    }

    /// Call [`report`](Self::report) every `interval` until the task is aborted
    pub fn spawn_reporter(
        &self,
        service: String,
        sink: Arc<dyn MessageSink>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let metrics = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                metrics.report(&service, sink.as_ref());
            }
        })
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub decode_errors: u64,
    pub published: u64,
    pub publish_failures: u64,
    pub connections: i64,
    pub connections_rejected: u64,
    pub latency_samples: u64,
    pub latency_sum_seconds: f64,
}

impl MetricsSnapshot {
    pub fn mean_latency_ms(&self) -> f64 {
        if self.latency_samples == 0 {
            0.0
        } else {
            self.latency_sum_seconds * 1000.0 / self.latency_samples as f64
        }
    }
}
