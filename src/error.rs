//! Error types for ayi-client.

use thiserror::Error;

/// Main error type for all client operations.
#[derive(Debug, Error)]
pub enum AyiError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protobuf payload could not be decoded.
    #[error("Protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// JSON serialization/deserialization error (config and credential files).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error (invalid header, bad size field, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Payload exceeds the 65530 bytes a frame can carry.
    #[error("Payload of {0} bytes exceeds maximum of 65530")]
    PayloadTooLarge(usize),

    /// Peer closed the stream, possibly in the middle of a frame.
    #[error("End of stream")]
    EndOfStream,

    /// Connection closed or the client was shut down.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation needs an open connection.
    #[error("Client isn't connected")]
    NotConnected,

    /// Operation needs an authenticated session.
    #[error("User isn't authenticated")]
    NotAuthenticated,

    /// `connect()` called while a connection is open.
    #[error("Client already connected")]
    AlreadyConnected,

    /// `connect()` called while another attempt has not finished.
    #[error("A pending connect() call has not finished yet")]
    ConnectInProgress,

    /// Connect attempt exceeded the configured timeout.
    #[error("Timed out")]
    Timeout,
}

impl AyiError {
    /// Whether this error means the peer went away rather than a recoverable fault.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, AyiError::EndOfStream)
    }
}

/// Result type alias using AyiError.
pub type Result<T> = std::result::Result<T, AyiError>;

/// Client-side codes, numbered after the server's own error codes.
pub mod codes {
    /// Request succeeded.
    pub const NO_ERROR: i32 = 0;
    /// Unknown user or bad credentials.
    pub const INVALID_USER: i32 = 1;
    /// Account already exists.
    pub const USER_EXISTS: i32 = 2;
    /// Facebook account data incomplete.
    pub const FB_MISSING_DATA: i32 = 3;
    /// Facebook token rejected.
    pub const FB_INVALID_TOKEN: i32 = 4;
    /// Server could not parse the request.
    pub const MALFORMED_MESSAGE: i32 = 5;
    /// Connection closed before a response arrived.
    pub const CLOSED_CONNECTION: i32 = 6;
    /// No stored credentials to authenticate with.
    pub const NO_LOGIN_DATA: i32 = 7;
    /// Writing the request failed.
    pub const IO_UNEXPECTED_ERROR: i32 = 8;
    /// No response within the request timeout.
    pub const TIMEOUT: i32 = 9;
}

/// Terminal failure of a correlated request (account creation, new token,
/// authentication).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// No connection when the request was issued.
    #[error("not connected")]
    NotConnected,

    /// Authentication requested without a user id and token.
    #[error("no login data")]
    NoLoginData,

    /// Connection torn down while the request was pending.
    #[error("connection closed")]
    ConnectionClosed,

    /// Writing the request to the socket failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// No response within the configured request timeout.
    #[error("request timed out")]
    Timeout,

    /// Server rejected the request with this code.
    #[error("server error code {0}")]
    Server(i32),
}

impl RequestError {
    /// Numeric code for this failure.
    pub fn code(&self) -> i32 {
        match self {
            RequestError::NotConnected | RequestError::ConnectionClosed => codes::CLOSED_CONNECTION,
            RequestError::NoLoginData => codes::NO_LOGIN_DATA,
            RequestError::Transport(_) => codes::IO_UNEXPECTED_ERROR,
            RequestError::Timeout => codes::TIMEOUT,
            RequestError::Server(code) => *code,
        }
    }
}

/// Outcome delivered to a request listener.
pub type RequestResult = std::result::Result<(), RequestError>;
