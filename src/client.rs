//! Client builder and public handle.
//!
//! The [`ClientBuilder`] collects configuration and collaborators. The
//! [`Client`] is a cheap, cloneable handle onto the dispatcher task:
//! 1. `connect()` opens the socket and attaches it to the dispatcher
//! 2. the dispatcher starts the receive loop for that connection
//! 3. requests are posted to the dispatcher, which checks preconditions,
//!    writes the frame and parks the listener
//! 4. inbound frames resolve listeners or reach the notification sink
//!
//! # Example
//!
//! ```ignore
//! use ayi_client::{Client, FileCredentialStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .server("192.168.1.3", 1822)
//!         .credential_store(Arc::new(FileCredentialStore::new("credentials.json")))
//!         .build();
//!
//!     if let Some(login) = client.start().await? {
//!         login.wait().await;
//!     }
//!     client.keep_alive().await?;
//!     Ok(())
//! }
//! ```

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::connection::ConnectGuard;
use crate::error::{AyiError, Result};
use crate::host::{
    Alert, AlertSink, CredentialStore, Credentials, DiscardNotifications, MemoryCredentialStore,
    NoAlerts, NotificationSink,
};
use crate::protocol::messages::AuthType;
use crate::protocol::PacketType;
use crate::session::{
    spawn_dispatcher, AccountProfile, Command, ConnectionState, Delivery, Hooks, Listener,
    PendingRequest, SessionStatus, TokenRequest,
};
use crate::transport::{self, ServerAddr};
use crate::writer::spawn_writer_task;

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Builder for configuring and creating a [`Client`].
pub struct ClientBuilder {
    config: ClientConfig,
    store: Arc<dyn CredentialStore>,
    alerts: Arc<dyn AlertSink>,
    notifications: Arc<dyn NotificationSink>,
}

impl ClientBuilder {
    /// Create a builder with default settings, an in-memory credential store
    /// and no-op alert and notification sinks.
    pub fn new() -> Self {
        Self::from_config(ClientConfig::default())
    }

    /// Start from an existing configuration, e.g. one read with
    /// [`ClientConfig::from_json`].
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            store: Arc::new(MemoryCredentialStore::new()),
            alerts: Arc::new(NoAlerts),
            notifications: Arc::new(DiscardNotifications),
        }
    }

    /// Server to connect to.
    ///
    /// Default: 127.0.0.1:1822
    pub fn server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.server = ServerAddr::new(host, port);
        self
    }

    /// Version byte for outgoing headers.
    ///
    /// Default: 0
    pub fn protocol_version(mut self, version: u8) -> Self {
        self.config.protocol_version = version;
        self
    }

    /// Limit on establishing the TCP connection.
    ///
    /// Default: none
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = Some(duration_ms(timeout));
        self
    }

    /// Resolve correlated requests with `Timeout` if unanswered this long.
    ///
    /// Default: none, requests wait for a response or the connection closing.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = Some(duration_ms(timeout));
        self
    }

    /// Send a keep-alive this often while authenticated.
    ///
    /// Default: none
    pub fn keep_alive_interval(mut self, interval: Duration) -> Self {
        self.config.keep_alive_interval_ms = Some(duration_ms(interval));
        self
    }

    /// Capacity of the dispatcher and writer queues.
    ///
    /// Default: 1024
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = store;
        self
    }

    pub fn alerts(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn notifications(mut self, notifications: Arc<dyn NotificationSink>) -> Self {
        self.notifications = notifications;
        self
    }

    /// Build the client and spawn its dispatcher task. Does not connect.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Client {
        let hooks = Hooks {
            store: self.store,
            alerts: self.alerts,
            notifications: self.notifications,
        };
        let (status, _) = watch::channel(SessionStatus::default());
        let status = Arc::new(status);
        let (deliveries, dispatcher) =
            spawn_dispatcher(&self.config, hooks.clone(), status.clone());

        Client {
            inner: Arc::new(Inner {
                config: self.config,
                hooks,
                deliveries,
                status,
                connecting: AtomicBool::new(false),
                dispatcher,
            }),
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Inner {
    config: ClientConfig,
    hooks: Hooks,
    deliveries: mpsc::Sender<Delivery>,
    status: Arc<watch::Sender<SessionStatus>>,
    connecting: AtomicBool,
    dispatcher: JoinHandle<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

/// Handle to a client session.
///
/// Clones share one connection and one session. Dropping the last clone
/// stops the dispatcher and closes the connection; pending requests then
/// resolve to `None`.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Open the connection.
    ///
    /// Fails with `AlreadyConnected` if a connection is open and with
    /// `ConnectInProgress` if another call is still connecting. A failed
    /// attempt raises [`Alert::ServerUnreachable`]; a successful one clears
    /// it.
    pub async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Err(AyiError::AlreadyConnected);
        }
        let Some(_guard) = ConnectGuard::acquire(&self.inner.connecting) else {
            return Err(AyiError::ConnectInProgress);
        };
        if self.is_connected() {
            return Err(AyiError::AlreadyConnected);
        }

        self.set_connecting(true);
        let server = &self.inner.config.server;
        match self.open().await {
            Ok(()) => {
                tracing::debug!("Connected to {}", server);
                self.inner.hooks.alerts.clear(Alert::ServerUnreachable);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to connect to {}: {}", server, e);
                self.set_connecting(false);
                self.inner.hooks.alerts.raise(Alert::ServerUnreachable);
                Err(e)
            }
        }
    }

    async fn open(&self) -> Result<()> {
        let config = &self.inner.config;
        let (reader, writer) = transport::connect(&config.server, config.connect_timeout()).await?;
        let (writer, _writer_task) = spawn_writer_task(writer, config.channel_capacity);

        let (reply, attached) = oneshot::channel();
        self.post(Delivery::Attach {
            reader: Box::new(reader),
            writer,
            reply,
        })
        .await?;
        attached.await.map_err(|_| AyiError::ConnectionClosed)
    }

    fn set_connecting(&self, connecting: bool) {
        self.inner.status.send_if_modified(|status| match (connecting, status.state) {
            (true, ConnectionState::Disconnected) => {
                status.state = ConnectionState::Connecting;
                true
            }
            (false, ConnectionState::Connecting) => {
                status.state = ConnectionState::Disconnected;
                true
            }
            _ => false,
        });
    }

    /// Close the connection. Pending requests resolve with `ConnectionClosed`.
    /// Closing a closed client does nothing.
    pub async fn close(&self) {
        let (reply, closed) = oneshot::channel();
        if self.post(Delivery::Command(Command::Close { reply })).await.is_ok() {
            let _ = closed.await;
        }
    }

    /// Session start: connect, then log in silently with stored credentials.
    ///
    /// Returns the pending authentication when credentials were stored. With
    /// none stored, raises [`Alert::LoginNeeded`] and returns `None`.
    pub async fn start(&self) -> Result<Option<PendingRequest>> {
        let stored = self.stored_credentials();
        self.connect().await?;

        match stored {
            Some(credentials) => {
                let login = self
                    .authenticate(Some(&credentials.user_id), Some(&credentials.auth_token))
                    .await;
                Ok(Some(login))
            }
            None => {
                self.inner.hooks.alerts.raise(Alert::LoginNeeded);
                Ok(None)
            }
        }
    }

    /// Ask the server to create an account. Access is granted (and the new
    /// credentials stored) on success.
    ///
    /// Ignored, with the returned request never answered, while another
    /// account creation is pending.
    pub async fn create_account(&self, profile: AccountProfile) -> PendingRequest {
        self.request(|listener| Command::CreateAccount { profile, listener })
            .await
    }

    /// Ask the server for a fresh credential pair.
    ///
    /// Destructive: stored credentials are cleared and the session becomes
    /// unauthenticated before the request is sent, whatever the outcome.
    pub async fn new_auth_token(
        &self,
        principal: &str,
        secret: &str,
        mechanism: AuthType,
    ) -> PendingRequest {
        let request = TokenRequest {
            mechanism,
            principal: principal.to_owned(),
            secret: secret.to_owned(),
        };
        self.request(|listener| Command::NewAuthToken { request, listener })
            .await
    }

    pub async fn new_auth_token_by_email(&self, email: &str, password: &str) -> PendingRequest {
        self.new_auth_token(email, password, AuthType::Native).await
    }

    pub async fn new_auth_token_by_facebook(&self, id: &str, token: &str) -> PendingRequest {
        self.new_auth_token(id, token, AuthType::Facebook).await
    }

    /// Authenticate the session. Resolves with `NoLoginData`, without
    /// sending anything, when either value is missing.
    pub async fn authenticate(
        &self,
        user_id: Option<&str>,
        auth_token: Option<&str>,
    ) -> PendingRequest {
        let user_id = user_id.map(str::to_owned);
        let auth_token = auth_token.map(str::to_owned);
        self.request(|listener| Command::Authenticate {
            user_id,
            auth_token,
            listener,
        })
        .await
    }

    /// Authenticate with whatever the credential store holds.
    pub async fn authenticate_stored(&self) -> PendingRequest {
        self.request(|listener| Command::AuthenticateStored { listener })
            .await
    }

    /// Send a keep-alive ping. Needs an authenticated connection.
    pub async fn keep_alive(&self) -> Result<()> {
        self.call(|reply| Command::KeepAlive { reply }).await
    }

    /// Send a session request with an opaque payload (event, invitation,
    /// voting and position requests). Needs an authenticated connection.
    /// Responses arrive through the notification sink.
    pub async fn send(&self, packet_type: PacketType, payload: impl Into<Bytes>) -> Result<()> {
        let payload = payload.into();
        self.call(|reply| Command::Send {
            packet_type,
            payload,
            reply,
        })
        .await
    }

    pub fn status(&self) -> SessionStatus {
        *self.inner.status.borrow()
    }

    /// Subscribe to status changes.
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.status().state
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status().authenticated
    }

    /// Whether the user has to log in, i.e. no credentials are stored.
    pub fn is_login_needed(&self) -> bool {
        self.stored_credentials().is_none()
    }

    pub fn server(&self) -> &ServerAddr {
        &self.inner.config.server
    }

    fn stored_credentials(&self) -> Option<Credentials> {
        match self.inner.hooks.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Failed to load stored credentials: {}", e);
                None
            }
        }
    }

    async fn post(&self, delivery: Delivery) -> Result<()> {
        self.inner
            .deliveries
            .send(delivery)
            .await
            .map_err(|_| AyiError::ConnectionClosed)
    }

    async fn request(&self, command: impl FnOnce(Listener) -> Command) -> PendingRequest {
        let (listener, pending) = PendingRequest::channel();
        if self.post(Delivery::Command(command(listener))).await.is_err() {
            tracing::warn!("Dispatcher stopped, request dropped");
        }
        pending
    }

    async fn call(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<()>>) -> Command,
    ) -> Result<()> {
        let (reply, result) = oneshot::channel();
        self.post(Delivery::Command(command(reply))).await?;
        result.await.map_err(|_| AyiError::ConnectionClosed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use crate::host::ActiveAlerts;

    #[test]
    fn test_builder_configuration() {
        let builder = Client::builder()
            .server("10.0.0.5", 4000)
            .protocol_version(3)
            .connect_timeout(Duration::from_secs(2))
            .request_timeout(Duration::from_millis(1500))
            .keep_alive_interval(Duration::from_secs(30))
            .channel_capacity(64);

        let config = &builder.config;
        assert_eq!(config.server, ServerAddr::new("10.0.0.5", 4000));
        assert_eq!(config.protocol_version, 3);
        assert_eq!(config.connect_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.keep_alive_interval(), Some(Duration::from_secs(30)));
        assert_eq!(config.channel_capacity, 64);
    }

    #[test]
    fn test_builder_default() {
        let builder = ClientBuilder::default();
        assert_eq!(builder.config, ClientConfig::default());
    }

    #[tokio::test]
    async fn test_new_client_is_disconnected() {
        let client = Client::builder().build();
        assert_eq!(client.status(), SessionStatus::default());
        assert!(client.is_login_needed());

        let pending = client.authenticate(Some("u1"), Some("t1")).await;
        assert_eq!(pending.wait().await, Some(Err(RequestError::NotConnected)));
        assert!(matches!(client.keep_alive().await, Err(AyiError::NotConnected)));

        client.close().await;
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_connect_failure_raises_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let alerts = Arc::new(ActiveAlerts::new());
        let client = Client::builder()
            .server("127.0.0.1", port)
            .alerts(alerts.clone())
            .build();

        assert!(client.connect().await.is_err());
        assert!(alerts.is_active(Alert::ServerUnreachable));
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_send_rejects_non_session_types() {
        let client = Client::builder().build();
        let err = client.send(PacketType::EventCreated, Bytes::new()).await;
        assert!(matches!(err, Err(AyiError::Protocol(_))));
    }
}
