//! Routing properties attached to every published event.

use std::collections::BTreeMap;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use crate::event::EventRecord;

pub const DEVICE_KEY: &str = "device";
pub const NETWORK_KEY: &str = "network";

/// Small string map that lets downstream consumers dispatch an event without
/// decoding its body. Always carries `device` and `network`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialization", serde(transparent))]
pub struct RoutingProperties(BTreeMap<String, String>);

impl RoutingProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the `device` / `network` pair from a decoded record.
    pub fn from_record(record: &EventRecord) -> Self {
        let mut props = Self::new();
        props.insert(DEVICE_KEY, record.device.clone());
        props.insert(NETWORK_KEY, record.network.clone());
        props
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn device(&self) -> Option<&str> {
        self.get(DEVICE_KEY)
    }

    pub fn network(&self) -> Option<&str> {
        self.get(NETWORK_KEY)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<BTreeMap<String, String>> for RoutingProperties {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}
