//! Transport abstraction layer for Angler.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! how the bot reaches a game server. The session controller only ever
//! talks to these traits, so tests can swap in scripted connections.
//!
//! # Feature Flags
//!
//! - `tcp` (default): length-prefixed frames over `tokio::net::TcpStream`

mod error;
#[cfg(feature = "tcp")]
mod tcp;

pub use error::TransportError;
#[cfg(feature = "tcp")]
pub use tcp::{MAX_FRAME_LEN, TcpConnection, TcpConnector};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opens outgoing connections to a game server.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Opens a connection to `host:port`.
    fn open(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// A single connection that can send and receive whole frames.
///
/// `close` must be safe to call more than once and from a different task
/// than the one blocked in `recv`; a pending `recv` then resolves to
/// `Ok(None)`.
pub trait Connection: Send + Sync + 'static {
    /// Sends one frame to the remote peer.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the stream has ended, either because the
    /// peer closed it or because [`close`](Self::close) was called.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the connection. Idempotent.
    fn close(&self) -> impl Future<Output = ()> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
