//! Transport Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default listen host (loopback only)
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listen port
pub const DEFAULT_PORT: u16 = 5555;

/// Transport configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Listen host
    pub host: String,

    /// Listen port (0 = let the OS pick, used by tests)
    pub port: u16,

    /// Read buffer size per `read` call
    pub read_buffer_size: usize,

    /// How long `stop()` waits for the I/O thread before detaching it
    pub join_timeout_ms: u64,

    /// Replies buffered for a client that is not reading; more are dropped
    pub outbound_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            read_buffer_size: 4096,
            join_timeout_ms: 1000,
            outbound_capacity: 100,
        }
    }
}

impl TransportConfig {
    /// Configuration bound to an OS-assigned loopback port
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            port: 0,
            ..Default::default()
        }
    }

    /// `host:port` string for binding
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Join timeout as a `Duration`
    #[must_use]
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5555);
        assert_eq!(config.listen_addr(), "127.0.0.1:5555");
        assert_eq!(config.join_timeout(), Duration::from_secs(1));
        assert_eq!(config.outbound_capacity, 100);
    }

    #[test]
    fn test_ephemeral() {
        let config = TransportConfig::ephemeral();
        assert_eq!(config.port, 0);
        assert_eq!(config.host, DEFAULT_HOST);
    }
}
