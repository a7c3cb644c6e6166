//! # ayi-client
//!
//! Async client for the AYI event server's binary protocol.
//!
//! The server speaks length-prefixed frames over one persistent TCP
//! connection: a 6-byte big-endian header (version, token, type, total
//! size) followed by a protobuf payload. This crate owns that connection,
//! the authentication state machine, and the correlation of account,
//! token and authentication requests with their responses.
//!
//! ## Architecture
//!
//! - **Writer task**: owns the socket's write half
//! - **Receive loop**: decodes frames and hands them off, never touching state
//! - **Dispatcher**: the single task where every state change happens
//!
//! Storage, alerts and notification display belong to the host and are
//! plugged in through the traits in [`host`].
//!
//! ## Example
//!
//! ```ignore
//! use ayi_client::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder().server("127.0.0.1", 1822).build();
//!     client.connect().await?;
//!
//!     let token = client.new_auth_token_by_email("me@example.com", "secret").await;
//!     if let Some(Ok(())) = token.wait().await {
//!         client.authenticate_stored().await.wait().await;
//!     }
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod host;
pub mod protocol;
pub mod transport;

mod client;
mod connection;
mod reader;
mod session;
mod writer;

pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use error::{AyiError, RequestError, RequestResult};
pub use host::{
    ActiveAlerts, Alert, AlertSink, CredentialStore, Credentials, FileCredentialStore,
    MemoryCredentialStore, Notification, NotificationSink,
};
pub use protocol::messages::AuthType;
pub use protocol::PacketType;
pub use reader::{read_frame, FrameReader};
pub use session::{AccountProfile, ConnectionState, Family, PendingRequest, SessionStatus};
