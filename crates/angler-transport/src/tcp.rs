//! Framed TCP transport built on `tokio::net::TcpStream`.
//!
//! Every frame on the wire is a 4-byte big-endian length followed by that
//! many payload bytes. What the payload means is the codec's business.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, watch};

use crate::{Connection, ConnectionId, Connector, TransportError};

/// Largest frame either side may send (2 MiB).
pub const MAX_FRAME_LEN: usize = 2 * 1024 * 1024;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A [`Connector`] that dials plain TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
}

impl TcpConnector {
    /// Creates a connector with a 10 second connect timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(10))
    }

    /// Creates a connector with a custom connect timeout.
    pub fn with_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for TcpConnector {
    type Connection = TcpConnection;

    async fn open(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Self::Connection, TransportError> {
        let addr = format!("{host}:{port}");
        let stream = match tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect(&addr),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(TransportError::ConnectFailed { addr, source });
            }
            Err(_) => {
                return Err(TransportError::ConnectFailed {
                    addr,
                    source: std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "connect timed out",
                    ),
                });
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "could not disable nagle");
        }

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, "opened TCP connection");

        Ok(TcpConnection::from_stream(id, stream))
    }
}

/// A single framed TCP connection.
///
/// Reads and writes are guarded separately so a task blocked in
/// [`recv`](Connection::recv) never stalls [`send`](Connection::send)
/// or [`close`](Connection::close).
pub struct TcpConnection {
    id: ConnectionId,
    reader: Mutex<BufReader<OwnedReadHalf>>,
    writer: Mutex<OwnedWriteHalf>,
    closed: watch::Sender<bool>,
}

impl TcpConnection {
    fn from_stream(id: ConnectionId, stream: TcpStream) -> Self {
        let (read, write) = stream.into_split();
        let (closed, _) = watch::channel(false);
        Self {
            id,
            reader: Mutex::new(BufReader::new(read)),
            writer: Mutex::new(write),
            closed,
        }
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl Connection for TcpConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, data).await
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Ok(None);
        }
        let mut reader = self.reader.lock().await;
        tokio::select! {
            frame = read_frame(&mut *reader) => frame,
            _ = closed.wait_for(|closed| *closed) => Ok(None),
        }
    }

    async fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            tracing::debug!(id = %self.id, error = %e, "shutdown after close failed");
        }
        tracing::debug!(id = %self.id, "closed TCP connection");
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Writes one length-prefixed frame.
async fn write_frame<W>(writer: &mut W, data: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    if data.len() > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge {
            len: data.len(),
            max: MAX_FRAME_LEN,
        });
    }
    writer
        .write_u32(data.len() as u32)
        .await
        .map_err(TransportError::SendFailed)?;
    writer
        .write_all(data)
        .await
        .map_err(TransportError::SendFailed)?;
    writer.flush().await.map_err(TransportError::SendFailed)
}

/// Reads one length-prefixed frame. EOF on a frame boundary is a clean end
/// of stream; EOF inside a frame is an error.
async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Ok(None);
        }
        Err(e) => return Err(TransportError::ReceiveFailed(e)),
    };
    if len > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(TransportError::ReceiveFailed)?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_frame_empty_input_is_end_of_stream() {
        let mut input: &[u8] = &[];
        let frame = read_frame(&mut input).await.unwrap();
        assert!(frame.is_none());
    }

    #[tokio::test]
    async fn test_read_frame_truncated_payload_is_error() {
        // Header promises 5 bytes, only 2 follow.
        let mut input: &[u8] = &[0, 0, 0, 5, b'h', b'i'];
        let result = read_frame(&mut input).await;
        assert!(matches!(result, Err(TransportError::ReceiveFailed(_))));
    }

    #[tokio::test]
    async fn test_read_frame_oversized_header_is_rejected() {
        let len = (MAX_FRAME_LEN as u32 + 1).to_be_bytes();
        let mut input: &[u8] = &len;
        let result = read_frame(&mut input).await;
        assert!(matches!(
            result,
            Err(TransportError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_write_then_read_frame_preserves_payload() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"hello").await.unwrap();
        assert_eq!(&wire[..4], &[0, 0, 0, 5]);

        let mut input: &[u8] = &wire;
        let frame = read_frame(&mut input).await.unwrap();
        assert_eq!(frame.as_deref(), Some(&b"hello"[..]));
    }
}
