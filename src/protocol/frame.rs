//! Frame struct with typed accessors.
//!
//! Represents a complete protocol frame with header and payload.
//! Uses `bytes::Bytes` for zero-copy payload sharing.
//!
//! # Example
//!
//! ```
//! use ayi_client::protocol::{Frame, PacketType};
//!
//! let frame = Frame::encode(0, PacketType::Ping, &b"hello"[..]).unwrap();
//!
//! assert_eq!(frame.packet_type(), Some(PacketType::Ping));
//! assert_eq!(frame.header.total_size, 11);
//! assert_eq!(frame.payload(), b"hello");
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::packet_type::PacketType;
use super::wire_format::{Header, HEADER_SIZE};
use crate::error::Result;

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from header and payload.
    pub fn new(header: Header, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Build a frame for an outbound message.
    ///
    /// Fails with `PayloadTooLarge` when the payload exceeds 65530 bytes.
    pub fn encode(version: u8, packet_type: PacketType, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let header = Header::for_payload(version, packet_type.as_u8(), payload.len())?;
        Ok(Self { header, payload })
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the raw type tag.
    #[inline]
    pub fn type_tag(&self) -> u8 {
        self.header.packet_type
    }

    /// Get the typed packet type, `None` for unknown tags.
    #[inline]
    pub fn packet_type(&self) -> Option<PacketType> {
        PacketType::from_u8(self.header.packet_type)
    }

    /// Serialize header and payload into one contiguous buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        buf.put_slice(&self.header.encode());
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AyiError;
    use crate::protocol::{FrameBuffer, MAX_PAYLOAD_SIZE};

    #[test]
    fn test_encode_sets_total_size() {
        let frame = Frame::encode(3, PacketType::UserAuth, vec![1u8, 2, 3]).unwrap();
        assert_eq!(frame.header.version, 3);
        assert_eq!(frame.header.token, 0);
        assert_eq!(frame.header.total_size as usize, HEADER_SIZE + 3);
        assert_eq!(frame.type_tag(), 0x0D);
    }

    #[test]
    fn test_encode_max_payload_boundary() {
        assert!(Frame::encode(0, PacketType::Ping, vec![0u8; MAX_PAYLOAD_SIZE]).is_ok());

        let err = Frame::encode(0, PacketType::Ping, vec![0u8; MAX_PAYLOAD_SIZE + 1]).unwrap_err();
        assert!(matches!(err, AyiError::PayloadTooLarge(65531)));
    }

    #[test]
    fn test_max_payload_survives_decoding() {
        let payload = vec![0x5Au8; MAX_PAYLOAD_SIZE];
        let frame = Frame::encode(0, PacketType::EventsList, payload.clone()).unwrap();

        let frames = FrameBuffer::new().push(&frame.to_bytes()).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), payload.as_slice());
    }

    #[test]
    fn test_unknown_tag_has_no_packet_type() {
        let frame = Frame::new(Header::new(0, 0, 0x3A, 6), Bytes::new());
        assert_eq!(frame.packet_type(), None);
        assert_eq!(frame.type_tag(), 0x3A);
    }

    #[test]
    fn test_to_bytes_layout() {
        let frame = Frame::encode(0, PacketType::Ok, &b"ab"[..]).unwrap();
        let bytes = frame.to_bytes();
        assert_eq!(&bytes[..], &[0, 0, 0, 0x7E, 0, 8, b'a', b'b']);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let payloads: [&[u8]; 3] = [b"", b"x", &[0xAB; 4096]];
        for payload in payloads {
            let frame = Frame::encode(0, PacketType::EventsList, payload.to_vec()).unwrap();

            let mut buffer = FrameBuffer::new();
            let frames = buffer.push(&frame.to_bytes()).unwrap();

            assert_eq!(frames.len(), 1);
            assert_eq!(frames[0].packet_type(), Some(PacketType::EventsList));
            assert_eq!(frames[0].payload(), payload);
        }
    }
}
