//! Protocol module - wire format, framing, and payload schemas.
//!
//! This module implements the binary protocol spoken with the server:
//! - 6-byte header encoding/decoding
//! - Frame buffer for accumulating partial reads
//! - Frame struct with typed accessors
//! - Type tags and the protobuf messages the client itself interprets

mod frame;
mod frame_buffer;
pub mod messages;
mod packet_type;
mod wire_format;

pub use frame::Frame;
pub use frame_buffer::FrameBuffer;
pub use packet_type::PacketType;
pub use wire_format::{Header, DEFAULT_PROTOCOL_VERSION, HEADER_SIZE, MAX_PAYLOAD_SIZE};
