//! Wire format encoding and decoding.
//!
//! Implements the 6-byte header format:
//! ```text
//! ┌─────────┬──────────┬────────┬────────────┐
//! │ Version │ Token    │ Type   │ Total size │
//! │ 1 byte  │ 2 bytes  │ 1 byte │ 2 bytes    │
//! │         │ uint16 BE│        │ uint16 BE  │
//! └─────────┴──────────┴────────┴────────────┘
//! ```
//!
//! `total_size` counts the header itself, so a frame with an empty payload
//! carries `total_size == 6`. All multi-byte integers are Big Endian.
//!
//! A full 65530-byte payload makes the total 65536, one past what the field
//! holds. It wraps to 0 on the wire, and a size field of 0 is read back as
//! that maximum.

use crate::error::{AyiError, Result};

/// Header size in bytes (fixed, exactly 6).
pub const HEADER_SIZE: usize = 6;

/// Maximum payload size.
pub const MAX_PAYLOAD_SIZE: usize = 65530;

/// Protocol version written by default.
pub const DEFAULT_PROTOCOL_VERSION: u8 = 0;

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Protocol version, informational.
    pub version: u8,
    /// Correlation token. Carried but not used for routing.
    pub token: u16,
    /// Raw message type tag.
    pub packet_type: u8,
    /// Header plus payload length.
    pub total_size: u16,
}

impl Header {
    /// Create a new header.
    pub fn new(version: u8, token: u16, packet_type: u8, total_size: u16) -> Self {
        Self {
            version,
            token,
            packet_type,
            total_size,
        }
    }

    /// Build the header for a payload of `payload_len` bytes.
    ///
    /// Fails with [`AyiError::PayloadTooLarge`] above [`MAX_PAYLOAD_SIZE`].
    pub fn for_payload(version: u8, packet_type: u8, payload_len: usize) -> Result<Self> {
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(AyiError::PayloadTooLarge(payload_len));
        }
        // 65536 wraps to 0
        let total_size = ((HEADER_SIZE + payload_len) & 0xFFFF) as u16;
        Ok(Self::new(version, 0, packet_type, total_size))
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use ayi_client::protocol::Header;
    ///
    /// let header = Header::new(0, 42, 0x0D, 10);
    /// assert_eq!(header.encode(), [0, 0, 42, 0x0D, 0, 10]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.version;
        buf[1..3].copy_from_slice(&self.token.to_be_bytes());
        buf[3] = self.packet_type;
        buf[4..6].copy_from_slice(&self.total_size.to_be_bytes());
        buf
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            version: buf[0],
            token: u16::from_be_bytes([buf[1], buf[2]]),
            packet_type: buf[3],
            total_size: u16::from_be_bytes([buf[4], buf[5]]),
        })
    }

    /// Reject headers whose size field cannot even cover the header.
    pub fn validate(&self) -> Result<()> {
        if self.total_size != 0 && (self.total_size as usize) < HEADER_SIZE {
            return Err(AyiError::Protocol(format!(
                "Total size {} is smaller than the header",
                self.total_size
            )));
        }
        Ok(())
    }

    /// Payload length implied by `total_size`.
    #[inline]
    pub fn payload_len(&self) -> usize {
        match self.total_size {
            0 => MAX_PAYLOAD_SIZE,
            size => (size as usize).saturating_sub(HEADER_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode_roundtrip() {
        let original = Header::new(1, 0xBEEF, 0x7E, 106);
        let decoded = Header::decode(&original.encode()).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_header_big_endian_byte_order() {
        let bytes = Header::new(0x01, 0x0203, 0x04, 0x0506).encode();
        assert_eq!(bytes, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    }

    #[test]
    fn test_decode_too_short_buffer() {
        assert!(Header::decode(&[0u8; 5]).is_none());
    }

    #[test]
    fn test_for_payload_limits() {
        let header = Header::for_payload(0, 0x0D, MAX_PAYLOAD_SIZE).unwrap();
        assert_eq!(header.total_size, 0);
        assert_eq!(header.payload_len(), 65530);

        let header = Header::for_payload(0, 0x0D, MAX_PAYLOAD_SIZE - 1).unwrap();
        assert_eq!(header.total_size, u16::MAX);
        assert_eq!(header.payload_len(), 65529);

        let err = Header::for_payload(0, 0x0D, MAX_PAYLOAD_SIZE + 1).unwrap_err();
        assert!(matches!(err, AyiError::PayloadTooLarge(65531)));
    }

    #[test]
    fn test_validate_undersized_total() {
        assert!(Header::new(0, 0, 0x7E, 5).validate().is_err());
        assert!(Header::new(0, 0, 0x7E, 1).validate().is_err());
        assert!(Header::new(0, 0, 0x7E, 6).validate().is_ok());
        assert!(Header::new(0, 0, 0x7E, 0).validate().is_ok());
    }
}
