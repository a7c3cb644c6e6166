//! Protobuf payloads the client builds or interprets itself.
//!
//! Other payloads (events, invitations, positions) pass through the client
//! as opaque bytes.

/// Authentication mechanism for a new-token request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum AuthType {
    /// E-mail and password.
    Native = 0,
    /// Facebook id and access token.
    Facebook = 1,
}

/// Sub-type of an `Ok` acknowledgment confirming authentication.
pub const OK_AUTH: i32 = 0;

/// Account creation request.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateUserAccount {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub email: String,
    #[prost(string, tag = "3")]
    pub password: String,
    #[prost(string, tag = "4")]
    pub phone: String,
    #[prost(string, tag = "5")]
    pub fbid: String,
    #[prost(string, tag = "6")]
    pub fbtoken: String,
}

/// Request for a fresh user id / auth token pair.
#[derive(Clone, PartialEq, prost::Message)]
pub struct NewAuthToken {
    #[prost(string, tag = "1")]
    pub pass1: String,
    #[prost(string, tag = "2")]
    pub pass2: String,
    #[prost(enumeration = "AuthType", tag = "3")]
    pub r#type: i32,
}

/// Session authentication with a stored credential pair.
#[derive(Clone, PartialEq, prost::Message)]
pub struct UserAuthentication {
    #[prost(string, tag = "1")]
    pub user_id: String,
    #[prost(string, tag = "2")]
    pub auth_token: String,
}

/// Keep-alive carrying the client clock in seconds since the epoch.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Ping {
    #[prost(int64, tag = "1")]
    pub current_time: i64,
}

/// Server grant of a new credential pair.
#[derive(Clone, PartialEq, prost::Message)]
pub struct AccessGranted {
    #[prost(string, tag = "1")]
    pub user_id: String,
    #[prost(string, tag = "2")]
    pub auth_token: String,
}

/// Generic success acknowledgment.
#[derive(Clone, PartialEq, prost::Message)]
pub struct OkResponse {
    #[prost(int32, tag = "1")]
    pub r#type: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
}

/// Generic error naming the request type that caused it.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ErrorResponse {
    #[prost(int32, tag = "1")]
    pub r#type: i32,
    #[prost(int32, tag = "2")]
    pub error: i32,
}
