//! Wiring of the whole pipeline: listener, acceptor, queue, publisher.

use message_sink::MessageSink;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::InputConfig;
use crate::input::{ConnectionAcceptor, ConnectionContext};
use crate::lifecycle::Lifecycle;
use crate::metrics::InputMetrics;
use crate::output::{Publisher, PublisherStats};
use crate::queue::IngestQueue;
use crate::{AdapterError, Result};

/// How the service came down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Publisher finished on its own before the drain timeout
    pub drained: bool,
    /// Publisher totals, present when it finished
    pub stats: Option<PublisherStats>,
}

pub struct InputService {
    config: InputConfig,
    sink: Arc<dyn MessageSink>,
    lifecycle: Lifecycle,
    metrics: InputMetrics,
}

impl InputService {
    pub fn new(
        config: InputConfig,
        sink: Arc<dyn MessageSink>,
        lifecycle: Lifecycle,
    ) -> Result<Self> {
        Ok(Self {
            config,
            sink,
            lifecycle,
            metrics: InputMetrics::new()?,
        })
    }

    pub fn metrics(&self) -> &InputMetrics {
        &self.metrics
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Bind the listening socket. Failure here is fatal for the service.
    pub async fn bind(self) -> Result<BoundService> {
        let address = self.config.listen_addr()?;
        let listener = network::bind_listener(address).await.map_err(|source| {
            error!(address = %address, error = %source, "Bind failed");
            AdapterError::Bind {
                address: address.to_string(),
                source,
            }
        })?;

        Ok(BoundService {
            service: self,
            listener,
        })
    }

    /// Bind, then run until stopped
    pub async fn run(self) -> Result<ShutdownReport> {
        self.bind().await?.run().await
    }
}

/// A service whose listener is already bound
pub struct BoundService {
    service: InputService,
    listener: TcpListener,
}

impl BoundService {
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn metrics(&self) -> &InputMetrics {
        &self.service.metrics
    }

    /// Accept and publish until the lifecycle stops, then drain.
    ///
    /// After the acceptor exits, waits up to `drain_timeout_ms` for every
    /// open connection to end and the queue to empty. Connections still open
    /// at that point are left to the runtime teardown.
    pub async fn run(self) -> Result<ShutdownReport> {
        let BoundService { service, listener } = self;
        let InputService {
            config,
            sink,
            lifecycle,
            metrics,
        } = service;

        info!(
            service = %config.name,
            address = ?listener.local_addr().ok(),
            outputs = ?config.outputs,
            queue_capacity = config.queue_capacity,
            "Starting input service"
        );

        if let Err(e) = sink.connect().await {
            warn!(error = %e, "Sink not reachable yet, will connect on first publish");
        }

        let (queue_tx, queue_rx) = IngestQueue::bounded(config.queue_capacity);
        let publisher = Publisher::new(sink.clone(), config.outputs.clone(), metrics.clone());
        let mut publisher_task = tokio::spawn(publisher.run(queue_rx));

        let reporter = (config.stats_report_interval_seconds > 0).then(|| {
            metrics.spawn_reporter(
                config.name.clone(),
                sink.clone(),
                std::time::Duration::from_secs(config.stats_report_interval_seconds),
            )
        });

        let context = ConnectionContext::new(queue_tx, metrics.clone(), config.max_frame_len);
        ConnectionAcceptor::new(listener, context, lifecycle, config.accept_poll_interval())
            .with_connection_limit(config.connection_limit())
            .run()
            .await;

        let report = match tokio::time::timeout(config.drain_timeout(), &mut publisher_task).await {
            Ok(Ok(stats)) => ShutdownReport {
                drained: true,
                stats: Some(stats),
            },
            Ok(Err(e)) => {
                error!(error = %e, "Publisher task failed");
                ShutdownReport {
                    drained: false,
                    stats: None,
                }
            }
            Err(_) => {
                warn!(
                    timeout_ms = config.drain_timeout_ms,
                    open_connections = metrics.connections.get(),
                    "Drain timed out, abandoning queued events"
                );
                publisher_task.abort();
                ShutdownReport {
                    drained: false,
                    stats: None,
                }
            }
        };

        if let Some(reporter) = reporter {
            reporter.abort();
        }
        if let Err(e) = sink.disconnect().await {
            warn!(error = %e, "Sink disconnect failed");
        }

        info!("Shutdown.");
        Ok(report)
    }
}
