//! Connection plumbing: connect single-flight, the live link, and the
//! receive loop.
//!
//! A connection is a writer task plus a receive loop. The receive loop
//! never touches session state; it posts what it reads to the dispatcher
//! and lets the dispatcher decide.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AyiError;
use crate::protocol::Frame;
use crate::reader::FrameReader;
use crate::session::Delivery;
use crate::writer::WriterHandle;

/// Read half of a connection, boxed so tests can substitute in-memory pipes.
pub(crate) type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Serializes `connect()` calls.
///
/// Held for the duration of an attempt and released on drop, on every exit
/// path.
pub(crate) struct ConnectGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ConnectGuard<'a> {
    /// Claim the flag, or `None` if another attempt holds it.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ConnectGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// What the receive loop reports.
#[derive(Debug)]
pub(crate) enum Inbound {
    /// A complete frame.
    Frame(Frame),
    /// A read failed. The loop keeps reading.
    TransportError(AyiError),
    /// The peer closed the stream, or the stream can no longer be framed.
    Closed,
}

/// The open connection, owned by the dispatcher.
///
/// Dropping the link stops the receive loop and releases the writer
/// handle, which lets the writer task shut the socket down.
pub(crate) struct Link {
    id: u64,
    writer: WriterHandle,
    receiver: JoinHandle<()>,
}

impl Link {
    /// Start the receive loop for `reader` and wrap it with its writer.
    pub(crate) fn open(
        id: u64,
        reader: BoxedReader,
        writer: WriterHandle,
        deliveries: mpsc::Sender<Delivery>,
    ) -> Self {
        let receiver = tokio::spawn(receive_loop(id, FrameReader::new(reader), deliveries));
        Self { id, writer, receiver }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn writer(&self) -> &WriterHandle {
        &self.writer
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}

/// Read frames until the stream ends, posting each event to the dispatcher.
///
/// A read fault is reported and reading continues. End of stream is
/// reported once and ends the loop, as does a malformed header, since the
/// stream can no longer be split into frames after one.
pub(crate) async fn receive_loop<R>(
    link_id: u64,
    mut reader: FrameReader<R>,
    deliveries: mpsc::Sender<Delivery>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        let inbound = match reader.read_frame().await {
            Ok(frame) => {
                tracing::debug!(
                    "Packet {:#04x} read of size {}",
                    frame.type_tag(),
                    frame.header.total_size
                );
                Inbound::Frame(frame)
            }
            Err(AyiError::EndOfStream) => {
                tracing::debug!("Connection {} reached end of stream", link_id);
                Inbound::Closed
            }
            Err(AyiError::Protocol(reason)) => {
                tracing::error!("Connection {} sent a malformed frame: {}", link_id, reason);
                Inbound::Closed
            }
            Err(e) => Inbound::TransportError(e),
        };

        let last = matches!(inbound, Inbound::Closed);
        if deliveries.send(Delivery::Inbound { link_id, inbound }).await.is_err() || last {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PacketType;
    use std::collections::VecDeque;
    use std::io::ErrorKind;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{duplex, AsyncWriteExt, ReadBuf};

    /// Replays a fixed sequence of reads, then reports end of stream.
    struct ScriptedReader {
        steps: VecDeque<std::io::Result<Vec<u8>>>,
    }

    impl AsyncRead for ScriptedReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            match self.steps.pop_front() {
                Some(Ok(bytes)) => {
                    buf.put_slice(&bytes);
                    Poll::Ready(Ok(()))
                }
                Some(Err(e)) => Poll::Ready(Err(e)),
                None => Poll::Ready(Ok(())),
            }
        }
    }

    #[test]
    fn test_connect_guard_single_flight() {
        let flag = AtomicBool::new(false);
        let first = ConnectGuard::acquire(&flag);
        assert!(first.is_some());
        assert!(ConnectGuard::acquire(&flag).is_none());

        drop(first);
        assert!(!flag.load(Ordering::Acquire));
        assert!(ConnectGuard::acquire(&flag).is_some());
    }

    #[tokio::test]
    async fn test_receive_loop_reports_frames_then_close() {
        let (mut peer, local) = duplex(1024);
        let (tx, mut rx) = mpsc::channel(8);
        let task = tokio::spawn(receive_loop(7, FrameReader::new(local), tx));

        let frame = Frame::encode(0, PacketType::EventCreated, &b"ev"[..]).unwrap();
        peer.write_all(&frame.to_bytes()).await.unwrap();
        drop(peer);

        match rx.recv().await {
            Some(Delivery::Inbound { link_id: 7, inbound: Inbound::Frame(got) }) => {
                assert_eq!(got, frame)
            }
            _ => panic!("expected a frame delivery"),
        }
        assert!(matches!(
            rx.recv().await,
            Some(Delivery::Inbound { link_id: 7, inbound: Inbound::Closed })
        ));
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_receive_loop_stops_on_malformed_header() {
        let (mut peer, local) = duplex(64);
        let (tx, mut rx) = mpsc::channel(8);
        let task = tokio::spawn(receive_loop(1, FrameReader::new(local), tx));

        // total_size of 3 is smaller than the header itself
        peer.write_all(&[0, 0, 0, 0x7E, 0, 3]).await.unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(Delivery::Inbound { inbound: Inbound::Closed, .. })
        ));
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_receive_loop_continues_after_read_error() {
        let frame = Frame::encode(0, PacketType::EventCreated, &b"abcdef"[..]).unwrap();
        let bytes = frame.to_bytes();
        let reader = ScriptedReader {
            steps: VecDeque::from([
                Ok(bytes[..4].to_vec()),
                Err(std::io::Error::from(ErrorKind::ConnectionReset)),
                Ok(bytes[4..].to_vec()),
            ]),
        };
        let (tx, mut rx) = mpsc::channel(8);
        let task = tokio::spawn(receive_loop(3, FrameReader::new(reader), tx));

        match rx.recv().await {
            Some(Delivery::Inbound {
                link_id: 3,
                inbound: Inbound::TransportError(AyiError::Io(e)),
            }) => assert_eq!(e.kind(), ErrorKind::ConnectionReset),
            _ => panic!("expected a transport error delivery"),
        }
        match rx.recv().await {
            Some(Delivery::Inbound { link_id: 3, inbound: Inbound::Frame(got) }) => {
                assert_eq!(&got.payload[..], b"abcdef");
                assert_eq!(got, frame);
            }
            _ => panic!("expected the frame split around the fault"),
        }
        assert!(matches!(
            rx.recv().await,
            Some(Delivery::Inbound { link_id: 3, inbound: Inbound::Closed })
        ));
        task.await.unwrap();
    }
}
