//! Sink configuration
//!
//! TOML-friendly description of where published events go. Endpoints are URLs:
//! `tcp://host:port` or `unix:///path/to/socket`. A bare `host:port` means TCP.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::SinkError;

/// Configuration for the downstream sink
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Connection endpoint
    pub endpoint: String,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            endpoint: "tcp://127.0.0.1:6790".to_string(),
            connect_timeout_ms: 5000,
        }
    }
}

impl SinkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Parse the endpoint into a connection type
    pub fn connection_type(&self) -> Result<ConnectionType, SinkError> {
        ConnectionType::parse(&self.endpoint)
    }

    pub fn validate(&self) -> Result<(), SinkError> {
        self.connection_type()?;
        if self.connect_timeout_ms == 0 {
            return Err(SinkError::invalid_config(
                "connect_timeout_ms must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Connection type for DirectSink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionType {
    /// TCP connection, `host:port`
    Tcp(String),
    /// Unix socket connection, filesystem path
    Unix(String),
}

impl ConnectionType {
    pub fn parse(endpoint: &str) -> Result<Self, SinkError> {
        let endpoint = endpoint.trim();
        if let Some(path) = endpoint.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(SinkError::invalid_config(
                    "Unix socket path cannot be empty",
                ));
            }
            return Ok(ConnectionType::Unix(path.to_string()));
        }

        let address = endpoint.strip_prefix("tcp://").unwrap_or(endpoint);
        match address.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(ConnectionType::Tcp(address.to_string()))
            }
            _ => Err(SinkError::invalid_config(format!(
                "Endpoint '{}' must be tcp://host:port or unix:///path",
                endpoint
            ))),
        }
    }

    /// Endpoint in URL form
    pub fn endpoint(&self) -> String {
        match self {
            ConnectionType::Tcp(addr) => format!("tcp://{}", addr),
            ConnectionType::Unix(path) => format!("unix://{}", path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoints() {
        assert_eq!(
            ConnectionType::parse("tcp://10.0.0.1:6790").unwrap(),
            ConnectionType::Tcp("10.0.0.1:6790".to_string())
        );
        assert_eq!(
            ConnectionType::parse("localhost:6790").unwrap(),
            ConnectionType::Tcp("localhost:6790".to_string())
        );
        assert_eq!(
            ConnectionType::parse("unix:///tmp/events.sock").unwrap(),
            ConnectionType::Unix("/tmp/events.sock".to_string())
        );
    }

    #[test]
    fn test_reject_bad_endpoints() {
        assert!(ConnectionType::parse("unix://").is_err());
        assert!(ConnectionType::parse("tcp://nohost").is_err());
        assert!(ConnectionType::parse("tcp://:80").is_err());
        assert!(ConnectionType::parse("host:notaport").is_err());
    }

    #[test]
    fn test_endpoint_roundtrip() {
        let conn = ConnectionType::parse("unix:///run/sink.sock").unwrap();
        assert_eq!(conn.endpoint(), "unix:///run/sink.sock");
    }

    #[test]
    fn test_toml_config() {
        let config: SinkConfig = toml::from_str(
            r#"
            endpoint = "unix:///var/run/events.sock"
            "#,
        )
        .unwrap();
        assert_eq!(config.connect_timeout_ms, 5000);
        assert!(config.validate().is_ok());

        let bad = SinkConfig {
            connect_timeout_ms: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
