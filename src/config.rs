//! Client configuration.
//!
//! Every field has a default, so a config file only names what it changes:
//!
//! ```json
//! { "server": { "host": "192.168.1.3", "port": 1822 }, "request_timeout_ms": 10000 }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::DEFAULT_PROTOCOL_VERSION;
use crate::transport::ServerAddr;
use crate::writer::DEFAULT_CHANNEL_CAPACITY;

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 1822;

/// Tunables for a [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address. Fixed for the client's lifetime.
    pub server: ServerAddr,
    /// Version byte stamped on every outgoing header.
    pub protocol_version: u8,
    /// Limit on establishing the TCP connection. `None` waits for the OS.
    pub connect_timeout_ms: Option<u64>,
    /// Limit on waiting for a correlated response. `None` waits for the
    /// response or the connection closing, whichever comes first.
    pub request_timeout_ms: Option<u64>,
    /// Period of automatic keep-alive pings while authenticated. `None`
    /// leaves keep-alive to the caller.
    pub keep_alive_interval_ms: Option<u64>,
    /// Capacity of the writer and dispatcher queues.
    pub channel_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: ServerAddr::new(DEFAULT_HOST, DEFAULT_PORT),
            protocol_version: DEFAULT_PROTOCOL_VERSION,
            connect_timeout_ms: None,
            request_timeout_ms: None,
            keep_alive_interval_ms: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Keep-alive period. A zero period counts as disabled.
    pub fn keep_alive_interval(&self) -> Option<Duration> {
        self.keep_alive_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}
