//! Session state machine.
//!
//! Owned by the dispatcher task and only ever touched from there. It holds
//! the live link, the authentication flag, and the three family slots, and
//! it decides what every inbound frame means.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use super::slots::{Family, Listener, PendingSlots};
use super::{AccountProfile, Command, ConnectionState, Delivery, SessionStatus, TokenRequest};
use crate::codec::ProtoCodec;
use crate::config::ClientConfig;
use crate::connection::{BoxedReader, Inbound, Link};
use crate::error::{AyiError, RequestError, Result};
use crate::host::{Alert, AlertSink, CredentialStore, Credentials, Notification, NotificationSink};
use crate::protocol::messages::{self, OK_AUTH};
use crate::protocol::{Frame, PacketType};
use crate::writer::WriterHandle;

/// External collaborators the session calls into.
#[derive(Clone)]
pub(crate) struct Hooks {
    pub store: Arc<dyn CredentialStore>,
    pub alerts: Arc<dyn AlertSink>,
    pub notifications: Arc<dyn NotificationSink>,
}

pub(crate) struct SessionController {
    version: u8,
    request_timeout: Option<Duration>,
    hooks: Hooks,
    status: Arc<watch::Sender<SessionStatus>>,
    deliveries: mpsc::Sender<Delivery>,
    link: Option<Link>,
    next_link_id: u64,
    authenticated: bool,
    slots: PendingSlots,
}

impl SessionController {
    pub(crate) fn new(
        config: &ClientConfig,
        hooks: Hooks,
        status: Arc<watch::Sender<SessionStatus>>,
        deliveries: mpsc::Sender<Delivery>,
    ) -> Self {
        Self {
            version: config.protocol_version,
            request_timeout: config.request_timeout(),
            hooks,
            status,
            deliveries,
            link: None,
            next_link_id: 0,
            authenticated: false,
            slots: PendingSlots::new(),
        }
    }

    pub(crate) async fn handle(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Attach { reader, writer, reply } => {
                self.attach(reader, writer);
                let _ = reply.send(());
            }
            Delivery::Inbound { link_id, inbound } => self.on_inbound(link_id, inbound),
            Delivery::Command(command) => self.execute(command).await,
        }
    }

    fn attach(&mut self, reader: BoxedReader, writer: WriterHandle) {
        if self.link.is_some() {
            self.teardown("replaced by a new connection");
        }
        self.next_link_id += 1;
        let link = Link::open(self.next_link_id, reader, writer, self.deliveries.clone());
        tracing::debug!("Connection {} attached", link.id());
        self.link = Some(link);
        self.authenticated = false;
        self.publish();
    }

    fn on_inbound(&mut self, link_id: u64, inbound: Inbound) {
        if self.link.as_ref().map(Link::id) != Some(link_id) {
            tracing::debug!("Ignoring input from stale connection {}", link_id);
            return;
        }
        match inbound {
            Inbound::Frame(frame) => self.route(frame),
            Inbound::TransportError(e) => {
                tracing::warn!("Transport error on connection {}: {}", link_id, e);
            }
            Inbound::Closed => self.teardown("peer closed the stream"),
        }
    }

    /// Drop the link and fail every pending request. Runs once per link.
    fn teardown(&mut self, reason: &str) {
        let Some(link) = self.link.take() else {
            return;
        };
        drop(link);
        self.authenticated = false;
        let drained = self.slots.drain(RequestError::ConnectionClosed);
        tracing::debug!("Connection closed ({}), {} pending request(s) failed", reason, drained);
        self.publish();
    }

    fn publish(&self) {
        let connected = self.link.is_some();
        let authenticated = self.authenticated;
        self.status.send_if_modified(|status| {
            let state = match (connected, status.state) {
                (true, _) => ConnectionState::Connected,
                // connect() owns the Connecting state until it attaches or fails
                (false, ConnectionState::Connecting) => ConnectionState::Connecting,
                (false, _) => ConnectionState::Disconnected,
            };
            let next = SessionStatus { state, authenticated };
            if *status == next {
                return false;
            }
            *status = next;
            true
        });
    }

    fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
        self.publish();
    }

    fn route(&mut self, frame: Frame) {
        let Some(packet_type) = frame.packet_type() else {
            tracing::debug!("Dropping packet with unknown type {:#04x}", frame.type_tag());
            return;
        };

        match packet_type {
            PacketType::AccessGranted => {
                if let Some(grant) = decode::<messages::AccessGranted>(&frame) {
                    self.on_access_granted(grant);
                }
            }
            PacketType::Ok => {
                if let Some(ok) = decode::<messages::OkResponse>(&frame) {
                    if ok.r#type == OK_AUTH {
                        self.on_authenticated();
                    } else {
                        self.forward(packet_type, frame.payload);
                    }
                }
            }
            PacketType::Error => {
                if let Some(error) = decode::<messages::ErrorResponse>(&frame) {
                    self.on_error(error, frame.payload);
                }
            }
            _ => self.forward(packet_type, frame.payload),
        }
    }

    fn on_access_granted(&mut self, grant: messages::AccessGranted) {
        let credentials = Credentials::new(grant.user_id, grant.auth_token);
        if let Err(e) = self.hooks.store.save(&credentials) {
            tracing::error!("Failed to persist granted credentials: {}", e);
        }
        tracing::debug!("Access granted to user {}", credentials.user_id);
        self.slots.resolve(Family::CreateAccount, Ok(()));
        self.slots.resolve(Family::NewAuthToken, Ok(()));
    }

    fn on_authenticated(&mut self) {
        self.set_authenticated(true);
        self.hooks.alerts.clear(Alert::LoginNeeded);
        self.slots.resolve(Family::Authenticate, Ok(()));
    }

    fn on_error(&mut self, error: messages::ErrorResponse, payload: Bytes) {
        let family = u8::try_from(error.r#type)
            .ok()
            .and_then(PacketType::from_u8)
            .and_then(Family::from_request_type);

        match family {
            Some(Family::Authenticate) => {
                tracing::debug!("Authentication rejected with code {}", error.error);
                self.clear_credentials();
                self.set_authenticated(false);
                self.hooks.alerts.raise(Alert::LoginNeeded);
                self.slots.resolve(Family::Authenticate, Err(RequestError::Server(error.error)));
            }
            Some(family) => {
                self.slots.resolve(family, Err(RequestError::Server(error.error)));
            }
            None => self.forward(PacketType::Error, payload),
        }
    }

    fn forward(&self, packet_type: PacketType, payload: Bytes) {
        self.hooks
            .notifications
            .on_notification(Notification { packet_type, payload });
    }

    fn clear_credentials(&self) {
        if let Err(e) = self.hooks.store.clear() {
            tracing::error!("Failed to clear stored credentials: {}", e);
        }
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::CreateAccount { profile, listener } => {
                self.create_account(profile, listener).await
            }
            Command::NewAuthToken { request, listener } => {
                self.new_auth_token(request, listener).await
            }
            Command::Authenticate {
                user_id,
                auth_token,
                listener,
            } => self.authenticate(user_id, auth_token, listener).await,
            Command::AuthenticateStored { listener } => {
                let stored = match self.hooks.store.load() {
                    Ok(stored) => stored,
                    Err(e) => {
                        tracing::warn!("Failed to load stored credentials: {}", e);
                        None
                    }
                };
                let (user_id, auth_token) = stored
                    .map(|c| (Some(c.user_id), Some(c.auth_token)))
                    .unwrap_or_default();
                self.authenticate(user_id, auth_token, listener).await
            }
            Command::KeepAlive { reply } => {
                let _ = reply.send(self.keep_alive().await);
            }
            Command::Send {
                packet_type,
                payload,
                reply,
            } => {
                let _ = reply.send(self.send(packet_type, payload).await);
            }
            Command::Close { reply } => {
                self.teardown("closed by caller");
                let _ = reply.send(());
            }
        }
    }

    /// Connected and no request of `family` in flight. Otherwise the
    /// listener is answered (not connected) or dropped (already pending).
    fn admit(&self, family: Family, listener: Listener) -> Option<Listener> {
        if self.link.is_none() {
            listener.resolve(Err(RequestError::NotConnected));
            return None;
        }
        if self.slots.is_occupied(family) {
            tracing::debug!("{:?} request already pending, ignoring", family);
            return None;
        }
        Some(listener)
    }

    async fn create_account(&mut self, profile: AccountProfile, listener: Listener) {
        let Some(listener) = self.admit(Family::CreateAccount, listener) else {
            return;
        };
        let payload = ProtoCodec::encode(&messages::CreateUserAccount {
            name: profile.name,
            email: profile.email,
            password: profile.password,
            phone: profile.phone,
            fbid: profile.fbid,
            fbtoken: profile.fbtoken,
        });
        self.request(Family::CreateAccount, payload, listener).await;
    }

    async fn new_auth_token(&mut self, request: TokenRequest, listener: Listener) {
        let Some(listener) = self.admit(Family::NewAuthToken, listener) else {
            return;
        };
        // The old pair is gone whatever the server answers.
        self.clear_credentials();
        self.set_authenticated(false);

        let payload = ProtoCodec::encode(&messages::NewAuthToken {
            pass1: request.principal,
            pass2: request.secret,
            r#type: request.mechanism as i32,
        });
        self.request(Family::NewAuthToken, payload, listener).await;
    }

    async fn authenticate(
        &mut self,
        user_id: Option<String>,
        auth_token: Option<String>,
        listener: Listener,
    ) {
        let Some(listener) = self.admit(Family::Authenticate, listener) else {
            return;
        };
        let (Some(user_id), Some(auth_token)) = (user_id, auth_token) else {
            listener.resolve(Err(RequestError::NoLoginData));
            return;
        };
        let payload = ProtoCodec::encode(&messages::UserAuthentication { user_id, auth_token });
        self.request(Family::Authenticate, payload, listener).await;
    }

    /// Write a family request and park its listener once the write succeeds.
    async fn request(&mut self, family: Family, payload: Bytes, listener: Listener) {
        if let Err(e) = self.write(family.request_type(), payload).await {
            tracing::warn!("Failed to send {:?} request: {}", family, e);
            listener.resolve(Err(RequestError::Transport(e.to_string())));
            return;
        }
        let deadline = self.request_timeout.map(|timeout| Instant::now() + timeout);
        if self.slots.occupy(family, listener, deadline).is_err() {
            tracing::debug!("{:?} slot taken while sending", family);
        }
    }

    fn check_service(&self) -> Result<()> {
        if self.link.is_none() {
            return Err(AyiError::NotConnected);
        }
        if !self.authenticated {
            return Err(AyiError::NotAuthenticated);
        }
        Ok(())
    }

    async fn keep_alive(&self) -> Result<()> {
        self.check_service()?;
        let current_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as i64)
            .unwrap_or_default();
        self.write(PacketType::Ping, ProtoCodec::encode(&messages::Ping { current_time }))
            .await
    }

    async fn send(&self, packet_type: PacketType, payload: Bytes) -> Result<()> {
        if !packet_type.is_session_request() {
            return Err(AyiError::Protocol(format!(
                "{:?} cannot be sent as a session request",
                packet_type
            )));
        }
        self.check_service()?;
        self.write(packet_type, payload).await
    }

    async fn write(&self, packet_type: PacketType, payload: Bytes) -> Result<()> {
        let link = self.link.as_ref().ok_or(AyiError::NotConnected)?;
        let frame = Frame::encode(self.version, packet_type, payload)?;
        link.writer().send(&frame).await?;
        tracing::debug!(
            "Packet {:#04x} written with size {}",
            frame.type_tag(),
            frame.header.total_size
        );
        Ok(())
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.slots.next_deadline()
    }

    pub(crate) fn expire_requests(&mut self, now: Instant) {
        for family in self.slots.expire(now) {
            tracing::warn!("{:?} request timed out", family);
        }
    }

    /// Periodic ping. Skipped unless connected and authenticated.
    pub(crate) async fn keep_alive_tick(&self) {
        if self.check_service().is_err() {
            return;
        }
        if let Err(e) = self.keep_alive().await {
            tracing::warn!("Keep-alive failed: {}", e);
        }
    }
}

fn decode<M: prost::Message + Default>(frame: &Frame) -> Option<M> {
    match ProtoCodec::decode(frame.payload()) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::warn!("Dropping malformed {:#04x} packet: {}", frame.type_tag(), e);
            None
        }
    }
}
