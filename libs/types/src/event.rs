//! Event schema and the decoded-event wrapper handed to the publisher.

use bytes::Bytes;
use std::time::{Duration, SystemTime};
use thiserror::Error;

use crate::routing::RoutingProperties;

/// Wire schema of one probe event.
///
/// Protobuf message; tags are stable and must not be reused:
///
/// | field   | tag | type                      |
/// |---------|-----|---------------------------|
/// | id      | 1   | string                    |
/// | time    | 2   | google.protobuf.Timestamp |
/// | action  | 3   | string                    |
/// | device  | 4   | string                    |
/// | network | 5   | string                    |
/// | origin  | 6   | string                    |
/// | risk    | 7   | double                    |
#[derive(Clone, PartialEq, prost::Message)]
pub struct EventRecord {
    /// Event identifier assigned by the probe
    #[prost(string, tag = "1")]
    pub id: String,
    /// Origination time at the probe
    #[prost(message, optional, tag = "2")]
    pub time: Option<prost_types::Timestamp>,
    /// What the probe observed (connection up, dns message, ...)
    #[prost(string, tag = "3")]
    pub action: String,
    /// Device identifier, used for routing
    #[prost(string, tag = "4")]
    pub device: String,
    /// Network identifier, used for routing
    #[prost(string, tag = "5")]
    pub network: String,
    /// Which side of the device the traffic came from
    #[prost(string, tag = "6")]
    pub origin: String,
    #[prost(double, tag = "7")]
    pub risk: f64,
}

/// Failure to derive a latency from an event's embedded timestamp.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventTimeError {
    #[error("event carries no origination time")]
    Missing,

    #[error("event origination time is invalid: {0}")]
    Invalid(String),

    #[error("event origination time is {ahead_ms}ms in the future")]
    InFuture { ahead_ms: u128 },
}

impl EventRecord {
    /// Origination time as a [`SystemTime`].
    pub fn origination_time(&self) -> Result<SystemTime, EventTimeError> {
        let ts = self.time.clone().ok_or(EventTimeError::Missing)?;
        SystemTime::try_from(ts).map_err(|e| EventTimeError::Invalid(e.to_string()))
    }

    /// Time elapsed between origination and `now`.
    pub fn latency_at(&self, now: SystemTime) -> Result<Duration, EventTimeError> {
        let origin = self.origination_time()?;
        now.duration_since(origin).map_err(|e| EventTimeError::InFuture {
            ahead_ms: e.duration().as_millis(),
        })
    }
}

/// A successfully decoded frame.
///
/// `payload` is the exact frame the record was decoded from. Publishing forwards
/// these bytes, so fields unknown to [`EventRecord`] survive the trip.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub record: EventRecord,
    pub payload: Bytes,
}

impl DecodedEvent {
    pub fn new(record: EventRecord, payload: Bytes) -> Self {
        Self { record, payload }
    }

    pub fn device(&self) -> &str {
        &self.record.device
    }

    pub fn network(&self) -> &str {
        &self.record.network
    }

    /// Routing keys derived from this event.
    pub fn routing_properties(&self) -> RoutingProperties {
        RoutingProperties::from_record(&self.record)
    }

    /// Latency from origination until now. Errors never affect publishing.
    pub fn latency(&self) -> Result<Duration, EventTimeError> {
        self.record.latency_at(SystemTime::now())
    }
}
