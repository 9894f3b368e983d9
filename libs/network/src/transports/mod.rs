//! Transport Layer
//!
//! TCP listener and connector helpers used by the input service and by sinks
//! that forward frames to a downstream peer.

pub mod tcp;


pub use tcp::{
    accept_with_timeout, bind_listener, configure_stream, connect, AcceptOutcome,
    TcpNetworkConfig,
};
