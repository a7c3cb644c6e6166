//! Blocking-style frame reads over an async byte stream.
//!
//! [`FrameReader`] pairs a reader with a [`FrameBuffer`] and hands out one
//! complete frame at a time. Buffered bytes survive a failed read, so the
//! caller may keep reading after a transport error without losing its place
//! in the stream.

use std::collections::VecDeque;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{AyiError, Result};
use crate::protocol::{Frame, FrameBuffer};

/// Read buffer size per socket read.
const READ_CHUNK_SIZE: usize = 16 * 1024;

/// Decodes frames from a byte stream.
pub struct FrameReader<R> {
    reader: R,
    buffer: FrameBuffer,
    ready: VecDeque<Frame>,
    chunk: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: FrameBuffer::new(),
            ready: VecDeque::new(),
            chunk: vec![0u8; READ_CHUNK_SIZE],
        }
    }

    /// Wait for the next complete frame.
    ///
    /// # Errors
    ///
    /// - `EndOfStream` when the peer closes, whether between frames or in the
    ///   middle of one.
    /// - `Io` for any other read fault. The reader stays usable.
    /// - `Protocol` for a header whose size field is below 6.
    pub async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(frame);
            }

            let n = match self.reader.read(&mut self.chunk).await {
                Ok(0) => {
                    if self.buffer.has_partial() {
                        tracing::debug!("Stream ended with {} buffered bytes", self.buffer.len());
                    }
                    return Err(AyiError::EndOfStream);
                }
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Err(AyiError::EndOfStream);
                }
                Err(e) => return Err(AyiError::Io(e)),
            };

            let frames = self.buffer.push(&self.chunk[..n])?;
            self.ready.extend(frames);
        }
    }
}

/// Read exactly one frame from `reader`.
///
/// Convenience for one-shot reads; use [`FrameReader`] for a stream of
/// frames, since bytes past the first frame are discarded here.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: R) -> Result<Frame> {
    FrameReader::new(reader).read_frame().await
}
