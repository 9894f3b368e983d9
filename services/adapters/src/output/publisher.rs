//! Single consumer of the ingest queue
//!
//! Decodes each frame, records its latency off the publish path, and sends it
//! to every configured output. Nothing is retried: a frame that fails to decode
//! and a message the sink refuses are both logged, counted and dropped.

use message_sink::{Message, MessageSink};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, trace, warn};
use types::{DecodedEvent, RawFrame};

use crate::metrics::InputMetrics;
use crate::queue::IngestReceiver;

/// What happened to one dequeued frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Payload was not a valid event
    Dropped,
    /// Event was offered to every output; counts are per output
    Published { delivered: usize, failed: usize },
}

/// Totals for one publisher run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublisherStats {
    pub frames: u64,
    pub decode_errors: u64,
    pub delivered: u64,
    pub failed: u64,
}

pub struct Publisher {
    sink: Arc<dyn MessageSink>,
    outputs: Vec<String>,
    metrics: InputMetrics,
}

impl Publisher {
    pub fn new(sink: Arc<dyn MessageSink>, outputs: Vec<String>, metrics: InputMetrics) -> Self {
        Self {
            sink,
            outputs,
            metrics,
        }
    }

    /// Drain `queue` until it is closed and empty
    pub async fn run(self, mut queue: IngestReceiver) -> PublisherStats {
        let mut stats = PublisherStats::default();

        while let Some(frame) = queue.dequeue().await {
            stats.frames += 1;
            match self.publish_frame(frame).await {
                FrameOutcome::Dropped => stats.decode_errors += 1,
                FrameOutcome::Published { delivered, failed } => {
                    stats.delivered += delivered as u64;
                    stats.failed += failed as u64;
                }
            }
        }

        info!(
            frames = stats.frames,
            delivered = stats.delivered,
            failed = stats.failed,
            decode_errors = stats.decode_errors,
            "Publisher finished"
        );
        stats
    }

    /// Decode one frame and send it to each output in turn
    pub async fn publish_frame(&self, frame: RawFrame) -> FrameOutcome {
        let len = frame.len();
        let event = match codec::decode(frame) {
            Ok(event) => event,
            Err(e) => {
                self.metrics.decode_errors.inc();
                warn!(bytes = len, error = %e, "Dropping undecodable event");
                return FrameOutcome::Dropped;
            }
        };

        self.record_latency(&event);

        let message = Message::from_event(&event, event.routing_properties());
        let mut delivered = 0;
        let mut failed = 0;

        for output in &self.outputs {
            match self.sink.send(message.to_target(output.as_str())).await {
                Ok(()) => {
                    delivered += 1;
                    self.metrics.published.inc();
                }
                Err(e) => {
                    failed += 1;
                    self.metrics.publish_failures.inc();
                    warn!(
                        output = %output,
                        id = %event.record.id,
                        device = event.device(),
                        error = %e,
                        "Publish failed"
                    );
                }
            }
        }

        debug!(id = %event.record.id, delivered, failed, "Event published");
        FrameOutcome::Published { delivered, failed }
    }

    /// Measured against the time of decode; the observation itself runs
    /// detached and its failure is never reported beyond a trace line.
    fn record_latency(&self, event: &DecodedEvent) {
        let observed_at = SystemTime::now();
        let record = event.record.clone();
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            match record.latency_at(observed_at) {
                Ok(latency) => metrics.observe_latency(latency),
                Err(e) => trace!(id = %record.id, error = %e, "Latency not recorded"),
            }
        });
    }
}
