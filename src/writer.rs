//! Dedicated writer task that owns the socket's write half.
//!
//! Frames reach the task over an mpsc channel. Each frame carries a
//! completion channel so the sender learns whether its own write made it
//! to the socket.
//!
//! ```text
//! Delivery context ─► mpsc::Sender<OutboundFrame> ─► Writer Task ─► Socket
//!        ▲                                               │
//!        └──────────── oneshot (write result) ───────────┘
//! ```
//!
//! A failed write is reported to the frames in that batch only; the task
//! keeps running so the connection survives a transient fault.

use std::io::IoSlice;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{AyiError, Result};
use crate::protocol::{Frame, HEADER_SIZE};

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum frames to batch in a single write operation.
const MAX_BATCH_SIZE: usize = 64;

/// A frame ready to be written to the socket.
#[derive(Debug)]
pub struct OutboundFrame {
    /// Pre-encoded header (6 bytes).
    pub header: [u8; HEADER_SIZE],
    /// Payload bytes.
    pub payload: Bytes,
    done: Option<oneshot::Sender<std::io::Result<()>>>,
}

impl OutboundFrame {
    /// Create a new outbound frame.
    #[inline]
    pub fn new(frame: &Frame) -> Self {
        Self {
            header: frame.header.encode(),
            payload: frame.payload.clone(),
            done: None,
        }
    }

    /// Total size of this frame (header + payload).
    #[inline]
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    fn complete(&mut self, result: std::io::Result<()>) {
        if let Some(done) = self.done.take() {
            let _ = done.send(result);
        }
    }
}

/// Handle for sending frames to the writer task.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<OutboundFrame>,
}

impl WriterHandle {
    /// Queue a frame and wait until it has been written and flushed.
    ///
    /// Returns `ConnectionClosed` if the writer task is gone, or the I/O
    /// error the write itself hit.
    pub async fn send(&self, frame: &Frame) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        let mut outbound = OutboundFrame::new(frame);
        outbound.done = Some(done_tx);

        self.tx
            .send(outbound)
            .await
            .map_err(|_| AyiError::ConnectionClosed)?;

        match done_rx.await {
            Ok(result) => result.map_err(AyiError::Io),
            Err(_) => Err(AyiError::ConnectionClosed),
        }
    }

    /// Whether the writer task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the writer task and return a handle for sending frames.
///
/// The task ends, dropping (and so closing) the writer, once every
/// [`WriterHandle`] is dropped.
pub fn spawn_writer_task<W>(writer: W, channel_capacity: usize) -> (WriterHandle, JoinHandle<()>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(channel_capacity.max(1));
    let task = tokio::spawn(writer_loop(rx, writer));
    (WriterHandle { tx }, task)
}

async fn writer_loop<W>(mut rx: mpsc::Receiver<OutboundFrame>, mut writer: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(first) = rx.recv().await {
        let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
        batch.push(first);
        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(frame) => batch.push(frame),
                Err(_) => break,
            }
        }

        match write_batch(&mut writer, &batch).await {
            Ok(()) => {
                for frame in &mut batch {
                    frame.complete(Ok(()));
                }
            }
            Err(e) => {
                tracing::warn!("Write of {} frame(s) failed: {}", batch.len(), e);
                for frame in &mut batch {
                    frame.complete(Err(std::io::Error::new(e.kind(), e.to_string())));
                }
            }
        }
    }

    let _ = writer.shutdown().await;
}

/// Write a batch of frames using scatter/gather I/O.
async fn write_batch<W>(writer: &mut W, batch: &[OutboundFrame]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let total_size: usize = batch.iter().map(OutboundFrame::size).sum();
    let mut total_written = 0;

    while total_written < total_size {
        let slices = build_remaining_slices(batch, total_written);
        let written = writer.write_vectored(&slices).await?;
        if written == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            ));
        }
        total_written += written;
    }

    writer.flush().await
}

/// Build IoSlice array for remaining data after a partial write.
fn build_remaining_slices(batch: &[OutboundFrame], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len() * 2);
    let mut offset = 0;

    for frame in batch {
        let parts: [&[u8]; 2] = [&frame.header, &frame.payload];
        for part in parts {
            let end = offset + part.len();
            if !part.is_empty() && skip_bytes < end {
                slices.push(IoSlice::new(&part[skip_bytes.saturating_sub(offset)..]));
            }
            offset = end;
        }
    }

    slices
}
