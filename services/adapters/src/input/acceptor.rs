//! Listening socket owner
//!
//! Polls for connections in short bounded waits so a stop request is noticed
//! within one poll interval, and spawns one reader task per accepted socket.
//!
//! An accept error pauses the loop for one poll interval before the next
//! attempt. Persistent errors such as descriptor exhaustion would otherwise
//! spin the loop.

use network::{accept_with_timeout, AcceptOutcome};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{info, warn};

use super::connection::ConnectionContext;
use crate::lifecycle::Lifecycle;

pub struct ConnectionAcceptor {
    listener: TcpListener,
    context: ConnectionContext,
    lifecycle: Lifecycle,
    poll_interval: Duration,
    slots: Option<Arc<Semaphore>>,
}

impl ConnectionAcceptor {
    pub fn new(
        listener: TcpListener,
        context: ConnectionContext,
        lifecycle: Lifecycle,
        poll_interval: Duration,
    ) -> Self {
        Self {
            listener,
            context,
            lifecycle,
            poll_interval,
            slots: None,
        }
    }

    /// Cap the number of simultaneously open connections
    pub fn with_connection_limit(mut self, limit: Option<usize>) -> Self {
        self.slots = limit.map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept until the lifecycle stops.
    ///
    /// Returns once the flag is observed cleared. Readers already spawned keep
    /// running and hold their own queue handles; the listener closes when this
    /// returns and drops `self`.
    pub async fn run(self) {
        info!(
            address = ?self.listener.local_addr().ok(),
            poll_ms = self.poll_interval.as_millis() as u64,
            "Accepting connections"
        );

        while self.lifecycle.is_running() {
            let outcome = accept_with_timeout(&self.listener, self.poll_interval).await;
            self.handle(outcome).await;
        }

        info!("Acceptor stopped");
    }

    async fn handle(&self, outcome: AcceptOutcome) {
        match outcome {
            AcceptOutcome::Accepted(stream, peer) => self.dispatch(stream, peer),
            AcceptOutcome::TimedOut => {}
            AcceptOutcome::Failed(e) => {
                warn!(
                    error = %e,
                    backoff_ms = self.poll_interval.as_millis() as u64,
                    "Accept failed"
                );
                tokio::time::sleep(self.poll_interval).await;
            }
        }
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        let permit = match self.reserve_slot() {
            Ok(permit) => permit,
            Err(_) => {
                self.context.metrics.connections_rejected.inc();
                warn!(peer = %peer, "Connection limit reached, closing connection");
                drop(stream);
                return;
            }
        };

        let context = self.context.clone();
        tokio::spawn(async move {
            let _permit = permit;
            context.metrics.connections.inc();
            context.run(stream, peer).await;
            context.metrics.connections.dec();
        });
    }

    fn reserve_slot(&self) -> Result<Option<OwnedSemaphorePermit>, TryAcquireError> {
        match &self.slots {
            None => Ok(None),
            Some(slots) => slots.clone().try_acquire_owned().map(Some),
        }
    }
}
