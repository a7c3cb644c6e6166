//! Session controller and the delivery context it runs on.
//!
//! All session state lives in one dispatcher task. Callers and the receive
//! loop talk to it only through [`Delivery`] messages, so two inbound
//! frames are never handled at once and a precondition check never races an
//! authentication change.

mod controller;
mod dispatcher;
mod slots;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::connection::{BoxedReader, Inbound};
use crate::error::Result;
use crate::protocol::messages::AuthType;
use crate::protocol::PacketType;
use crate::writer::WriterHandle;

pub(crate) use controller::Hooks;
pub(crate) use dispatcher::spawn_dispatcher;
pub(crate) use slots::Listener;
pub use slots::{Family, PendingRequest};

/// Transport state of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Snapshot of connection and authentication state.
///
/// `authenticated` is never true unless `state` is `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStatus {
    pub state: ConnectionState,
    pub authenticated: bool,
}

impl SessionStatus {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Fields of an account-creation request. Unused fields stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountProfile {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub fbid: String,
    pub fbtoken: String,
}

/// Secret pair for a new-token request, read according to `mechanism`:
/// e-mail and password for `Native`, id and access token for `Facebook`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub mechanism: AuthType,
    pub principal: String,
    pub secret: String,
}

/// Caller operations executed on the delivery context.
#[derive(Debug)]
pub(crate) enum Command {
    CreateAccount {
        profile: AccountProfile,
        listener: Listener,
    },
    NewAuthToken {
        request: TokenRequest,
        listener: Listener,
    },
    Authenticate {
        user_id: Option<String>,
        auth_token: Option<String>,
        listener: Listener,
    },
    AuthenticateStored {
        listener: Listener,
    },
    KeepAlive {
        reply: oneshot::Sender<Result<()>>,
    },
    Send {
        packet_type: PacketType,
        payload: Bytes,
        reply: oneshot::Sender<Result<()>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Everything the dispatcher task consumes.
pub(crate) enum Delivery {
    /// A new connection is up. The dispatcher starts its receive loop.
    Attach {
        reader: BoxedReader,
        writer: WriterHandle,
        reply: oneshot::Sender<()>,
    },
    /// Something the receive loop of connection `link_id` observed.
    Inbound { link_id: u64, inbound: Inbound },
    Command(Command),
}
