//! TCP connection to the server.
//!
//! # Example
//!
//! ```ignore
//! use ayi_client::transport::{connect, ServerAddr};
//!
//! let addr = ServerAddr::new("127.0.0.1", 1822);
//! let (reader, writer) = connect(&addr, None).await?;
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;

use crate::error::{AyiError, Result};

/// Read half handed to the receive loop.
pub type TcpReadHalf = tokio::net::tcp::OwnedReadHalf;

/// Write half handed to the writer task.
pub type TcpWriteHalf = tokio::net::tcp::OwnedWriteHalf;

/// Host/port pair of the server. Fixed for the lifetime of a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAddr {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl ServerAddr {
    /// Create a new address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Open a TCP connection and split it.
///
/// Nagle is disabled since most frames are small request/ack pairs.
pub async fn connect(
    addr: &ServerAddr,
    timeout: Option<Duration>,
) -> Result<(TcpReadHalf, TcpWriteHalf)> {
    let connect = TcpStream::connect((addr.host.as_str(), addr.port));
    let stream = match timeout {
        Some(limit) => tokio::time::timeout(limit, connect)
            .await
            .map_err(|_| AyiError::Timeout)??,
        None => connect.await?,
    };

    if let Err(e) = stream.set_nodelay(true) {
        tracing::warn!("Failed to set TCP_NODELAY on {}: {}", addr, e);
    }

    Ok(stream.into_split())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_server_addr_display() {
        assert_eq!(ServerAddr::new("192.168.1.3", 1822).to_string(), "192.168.1.3:1822");
    }

    #[tokio::test]
    async fn test_connect_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let addr = ServerAddr::new("127.0.0.1", port);
        let (connected, accepted) = tokio::join!(
            connect(&addr, Some(Duration::from_secs(5))),
            listener.accept()
        );
        assert!(connected.is_ok());
        assert!(accepted.is_ok());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = connect(&ServerAddr::new("127.0.0.1", port), None).await;
        assert!(matches!(result, Err(AyiError::Io(_))));
    }
}
