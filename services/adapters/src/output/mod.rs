//! Publish side: decoding queued frames and handing events to the sink

pub mod publisher;

pub use publisher::{FrameOutcome, Publisher, PublisherStats};
