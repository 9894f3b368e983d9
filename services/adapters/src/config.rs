//! Configuration for the input adapter
//!
//! Defaults, then an optional TOML file, then `INPUT_*` environment overrides,
//! then validation. The binary may still override the port from the command line.

use message_sink::SinkConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use crate::{AdapterError, Result};

/// Default listening port
pub const DEFAULT_PORT: u16 = 6789;
/// Default ingest queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Service name used in logs
    pub name: String,

    /// TCP port to listen on
    pub port: u16,

    /// Interface to bind
    pub bind_host: String,

    /// Frames buffered between the connection readers and the publisher
    pub queue_capacity: usize,

    /// Largest accepted frame payload in bytes
    pub max_frame_len: usize,

    /// How long one accept wait lasts before the running flag is re-checked
    pub accept_poll_interval_ms: u64,

    /// Open connection ceiling, 0 disables it
    pub max_connections: usize,

    /// Upper bound on waiting for the publisher to drain at shutdown
    pub drain_timeout_ms: u64,

    /// Output topics every event is published to
    pub outputs: Vec<String>,

    /// Downstream sink
    pub sink: SinkConfig,

    /// Interval between periodic stats log lines, 0 disables them
    pub stats_report_interval_seconds: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            name: "evs-input".to_string(),
            port: DEFAULT_PORT,
            bind_host: "0.0.0.0".to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_frame_len: types::MAX_FRAME_LEN,
            accept_poll_interval_ms: network::DEFAULT_ACCEPT_POLL_INTERVAL_MS,
            max_connections: 1024,
            drain_timeout_ms: 5000,
            outputs: vec!["cyberprobe".to_string()],
            sink: SinkConfig::default(),
            stats_report_interval_seconds: 60,
        }
    }
}

impl InputConfig {
    /// Load configuration: defaults, optional file, environment, validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            AdapterError::configuration(format!("{}: {}", path.display(), e))
        })
    }

    /// Apply `INPUT_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("INPUT_NAME") {
            self.name = name;
        }
        if let Some(port) = lookup("INPUT_PORT") {
            self.port = parse_var("INPUT_PORT", &port)?;
        }
        if let Some(host) = lookup("INPUT_BIND_HOST") {
            self.bind_host = host;
        }
        if let Some(capacity) = lookup("INPUT_QUEUE_CAPACITY") {
            self.queue_capacity = parse_var("INPUT_QUEUE_CAPACITY", &capacity)?;
        }
        if let Some(max) = lookup("INPUT_MAX_CONNECTIONS") {
            self.max_connections = parse_var("INPUT_MAX_CONNECTIONS", &max)?;
        }
        if let Some(outputs) = lookup("INPUT_OUTPUTS") {
            self.outputs = outputs
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(endpoint) = lookup("INPUT_SINK_ENDPOINT") {
            self.sink.endpoint = endpoint;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(AdapterError::configuration("name cannot be empty"));
        }
        self.listen_addr()?;

        if self.queue_capacity == 0 {
            return Err(AdapterError::configuration(
                "queue_capacity must be greater than 0",
            ));
        }
        if self.max_frame_len == 0 || self.max_frame_len > types::MAX_FRAME_LEN {
            return Err(AdapterError::configuration(format!(
                "max_frame_len must be in 1..={}",
                types::MAX_FRAME_LEN
            )));
        }
        if self.accept_poll_interval_ms == 0 {
            return Err(AdapterError::configuration(
                "accept_poll_interval_ms must be greater than 0",
            ));
        }
        if self.outputs.is_empty() {
            return Err(AdapterError::configuration(
                "at least one output is required",
            ));
        }
        if self.outputs.iter().any(|o| o.trim().is_empty()) {
            return Err(AdapterError::configuration("output names cannot be empty"));
        }

        self.sink
            .validate()
            .map_err(|e| AdapterError::configuration(format!("sink: {}", e)))
    }

    /// Socket address the listener binds to
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.bind_host.parse().map_err(|_| {
            AdapterError::configuration(format!(
                "bind_host '{}' is not an IP address",
                self.bind_host
            ))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn accept_poll_interval(&self) -> Duration {
        Duration::from_millis(self.accept_poll_interval_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Connection ceiling, `None` when unlimited
    pub fn connection_limit(&self) -> Option<usize> {
        (self.max_connections > 0).then_some(self.max_connections)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        AdapterError::configuration(format!("{} has invalid value '{}'", key, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = InputConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.name, "evs-input");
        assert_eq!(config.port, 6789);
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.max_frame_len, 128 * 1024 * 1024);
        assert_eq!(config.accept_poll_interval(), Duration::from_millis(100));
        assert_eq!(config.outputs, vec!["cyberprobe".to_string()]);
        assert_eq!(config.connection_limit(), Some(1024));
        assert_eq!(
            config.listen_addr().unwrap(),
            "0.0.0.0:6789".parse().unwrap()
        );
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            port = 7000
            queue_capacity = 16
            outputs = ["cyberprobe", "archive"]

            [sink]
            endpoint = "unix:///tmp/events.sock"
            "#
        )
        .unwrap();

        let config = InputConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.outputs.len(), 2);
        assert_eq!(config.sink.endpoint, "unix:///tmp/events.sock");
        assert_eq!(config.sink.connect_timeout_ms, 5000);
        assert_eq!(config.name, "evs-input");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_toml_is_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();

        let err = InputConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, AdapterError::Configuration(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = InputConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, AdapterError::Io(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = InputConfig::default();
        config
            .apply_overrides(lookup_from(&[
                ("INPUT_PORT", "7100"),
                ("INPUT_OUTPUTS", "cyberprobe, archive,"),
                ("INPUT_MAX_CONNECTIONS", "0"),
                ("INPUT_SINK_ENDPOINT", "tcp://10.1.1.1:9000"),
            ]))
            .unwrap();

        assert_eq!(config.port, 7100);
        assert_eq!(
            config.outputs,
            vec!["cyberprobe".to_string(), "archive".to_string()]
        );
        assert_eq!(config.connection_limit(), None);
        assert_eq!(config.sink.endpoint, "tcp://10.1.1.1:9000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = InputConfig::default();
        let err = config
            .apply_overrides(lookup_from(&[("INPUT_PORT", "70000")]))
            .unwrap_err();
        assert!(matches!(err, AdapterError::Configuration(_)));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_validation_rejects_invalid_values() {
        let cases: Vec<Box<dyn Fn(&mut InputConfig)>> = vec![
            Box::new(|c| c.queue_capacity = 0),
            Box::new(|c| c.max_frame_len = 0),
            Box::new(|c| c.max_frame_len = types::MAX_FRAME_LEN + 1),
            Box::new(|c| c.accept_poll_interval_ms = 0),
            Box::new(|c| c.outputs.clear()),
            Box::new(|c| c.outputs = vec![" ".to_string()]),
            Box::new(|c| c.bind_host = "not-an-ip".to_string()),
            Box::new(|c| c.sink.endpoint = "nowhere".to_string()),
            Box::new(|c| c.name.clear()),
        ];

        for mutate in cases {
            let mut config = InputConfig::default();
            mutate(&mut config);
            assert!(
                matches!(config.validate(), Err(AdapterError::Configuration(_))),
                "accepted invalid config: {:?}",
                config
            );
        }
    }
}
