//! Codec module - serialization/deserialization for payloads.
//!
//! Payloads the client builds or interprets are protobuf messages, handled
//! by [`ProtoCodec`]. Everything else travels as opaque bytes.
//!
//! # Example
//!
//! ```
//! use ayi_client::codec::ProtoCodec;
//! use ayi_client::protocol::messages::Ping;
//!
//! let encoded = ProtoCodec::encode(&Ping { current_time: 1_700_000_000 });
//! let decoded: Ping = ProtoCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded.current_time, 1_700_000_000);
//! ```

mod proto;

pub use proto::ProtoCodec;
