//! Network Infrastructure
//!
//! Wire framing and TCP plumbing for the event input pipeline.
//!
//! - [`framing`]: length-prefixed frame reader/writer with size enforcement
//! - [`transports`]: listener bind, poll-bounded accept, outbound connect
//! - [`time`]: overflow-safe nanosecond timestamps

pub mod error;
pub mod framing;
pub mod time;
pub mod transports;

// Re-export commonly used types
pub use error::{FramingError, Result, TransportError};
pub use framing::{encode_frame, FrameReader, FrameWriter};
pub use transports::{
    accept_with_timeout, bind_listener, configure_stream, connect, AcceptOutcome,
    TcpNetworkConfig,
};

pub use time::{
    current_timestamp_ns, safe_duration_to_ns_checked, safe_system_timestamp_ns_checked,
    TimestampError,
};

pub use types::{FRAME_HEADER_LEN, MAX_FRAME_LEN};

// Constants for configuration
pub const DEFAULT_ACCEPT_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 5;
