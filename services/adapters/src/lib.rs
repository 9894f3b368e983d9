//! # Event Input Adapter
//!
//! ## Purpose
//!
//! Accepts TCP connections from probes, each carrying a stream of
//! length-prefixed serialized events, and republishes every event to a
//! downstream sink together with its routing properties. Delivery latency and
//! throughput are recorded as Prometheus metrics.
//!
//! ## Integration Points
//!
//! - **Input**: TCP, one 4-byte big-endian length prefix per event frame
//! - **Output**: any [`message_sink::MessageSink`], one message per configured output
//! - **Configuration**: [`InputConfig`] from TOML plus `INPUT_*` environment overrides
//! - **Shutdown**: [`Lifecycle`] flag, set by SIGINT/SIGTERM in the binary
//!
//! ## Architecture Role
//!
//! ```text
//! ConnectionAcceptor ──spawn──► connection reader ─┐
//!                    ──spawn──► connection reader ─┼─► IngestQueue ─► Publisher ─► sink
//!                    ──spawn──► connection reader ─┘    (bounded)
//! ```
//!
//! The queue is the only point where the readers and the publisher meet. When
//! it is full, readers stop pulling bytes off their sockets and TCP flow
//! control pushes back on the probes.
//!
//! ## Failure Scope
//!
//! - a bad frame header closes that one connection
//! - a payload that does not decode is dropped, the connection stays open
//! - a publish failure drops that one message
//! - a bind failure stops the service before it starts

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod input;
pub mod lifecycle;
pub mod metrics;
pub mod output;
pub mod queue;
pub mod service;

pub use config::InputConfig;
pub use error::{AdapterError, Result};
pub use input::{ConnectionAcceptor, ConnectionContext, ConnectionEnd};
pub use lifecycle::Lifecycle;
pub use metrics::{InputMetrics, MetricsSnapshot};
pub use output::{FrameOutcome, Publisher, PublisherStats};
pub use queue::{IngestQueue, IngestReceiver, IngestSender};
pub use service::{BoundService, InputService, ShutdownReport};
