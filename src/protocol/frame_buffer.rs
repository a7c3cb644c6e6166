//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForHeader`: Need at least 6 bytes
//! - `WaitingForPayload`: Header parsed, need `total_size - 6` more bytes
//!
//! Partial frames are never surfaced: `push` only returns frames whose
//! payload is complete.

use bytes::{Bytes, BytesMut};

use super::wire_format::{Header, HEADER_SIZE};
use super::Frame;
use crate::error::Result;

/// Initial buffer capacity, one maximum-size frame.
const INITIAL_CAPACITY: usize = 64 * 1024;

/// State machine for frame parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for complete header (need 6 bytes).
    WaitingForHeader,
    /// Header parsed, waiting for payload bytes.
    WaitingForPayload { header: Header, remaining: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
}

impl FrameBuffer {
    /// Create a new frame buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            state: State::WaitingForHeader,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// If data is fragmented, partial data is buffered internally for the
    /// next push.
    ///
    /// # Errors
    ///
    /// Returns error if a header carries a total size smaller than 6.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        loop {
            match &self.state {
                State::WaitingForHeader => {
                    let Some(header) = Header::decode(&self.buffer) else {
                        return Ok(None);
                    };
                    header.validate()?;
                    let _ = self.buffer.split_to(HEADER_SIZE);

                    let remaining = header.payload_len();
                    if remaining == 0 {
                        return Ok(Some(Frame::new(header, Bytes::new())));
                    }
                    self.state = State::WaitingForPayload { header, remaining };
                }

                State::WaitingForPayload { header, remaining } => {
                    if self.buffer.len() < *remaining {
                        return Ok(None);
                    }
                    let payload = self.buffer.split_to(*remaining).freeze();
                    let header = *header;
                    self.state = State::WaitingForHeader;
                    return Ok(Some(Frame::new(header, payload)));
                }
            }
        }
    }

    /// Whether part of a frame has been received but not completed.
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty() || matches!(self.state, State::WaitingForPayload { .. })
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame_bytes(token: u16, packet_type: u8, payload: &[u8]) -> Vec<u8> {
        let header = Header::new(0, token, packet_type, (HEADER_SIZE + payload.len()) as u16);
        let mut bytes = header.encode().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&make_frame_bytes(42, 0x7E, b"hello")).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].header.token, 42);
        assert_eq!(frames[0].type_tag(), 0x7E);
        assert_eq!(frames[0].payload(), b"hello");
        assert!(!buffer.has_partial());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut buffer = FrameBuffer::new();
        let mut combined = make_frame_bytes(1, 0x40, b"first");
        combined.extend(make_frame_bytes(2, 0x41, b"second"));
        combined.extend(make_frame_bytes(3, 0x42, b""));

        let frames = buffer.push(&combined).unwrap();

        let tags: Vec<u8> = frames.iter().map(Frame::type_tag).collect();
        assert_eq!(tags, vec![0x40, 0x41, 0x42]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_header() {
        let mut buffer = FrameBuffer::new();
        let bytes = make_frame_bytes(1, 0x7F, b"test");

        assert!(buffer.push(&bytes[..4]).unwrap().is_empty());
        assert!(buffer.has_partial());

        let frames = buffer.push(&bytes[4..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), b"test");
        assert!(!buffer.has_partial());
    }

    #[test]
    fn test_fragmented_payload() {
        let mut buffer = FrameBuffer::new();
        let payload = b"this payload arrives in two pieces";
        let bytes = make_frame_bytes(1, 0x50, payload);

        let split = HEADER_SIZE + 10;
        assert!(buffer.push(&bytes[..split]).unwrap().is_empty());
        assert!(buffer.has_partial());

        let frames = buffer.push(&bytes[split..]).unwrap();
        assert_eq!(frames[0].payload(), payload);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = FrameBuffer::new();
        let mut all_frames = Vec::new();
        for byte in make_frame_bytes(9, 0xC0, b"hi") {
            all_frames.extend(buffer.push(&[byte]).unwrap());
        }

        assert_eq!(all_frames.len(), 1);
        assert_eq!(all_frames[0].payload(), b"hi");
    }

    #[test]
    fn test_undersized_total_rejected() {
        let mut buffer = FrameBuffer::new();
        let header = Header::new(0, 0, 0x7E, 3);
        assert!(buffer.push(&header.encode()).is_err());
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = FrameBuffer::new();
        let bytes = make_frame_bytes(1, 0x7E, b"test");
        buffer.push(&bytes[..HEADER_SIZE + 1]).unwrap();
        assert!(buffer.has_partial());

        buffer.clear();
        assert!(!buffer.has_partial());
    }
}
