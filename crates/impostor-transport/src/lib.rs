//! Network plumbing for the impostor server.
//!
//! Players reach the server over one long-lived socket each. This crate
//! hands those sockets to the server as [`Connection`]s, produced one at
//! a time by a listening [`Transport`]. Frames are opaque bytes here;
//! decoding them is the protocol crate's job.
//!
//! The `websocket` feature (on by default) provides
//! [`WebSocketTransport`], built on `tokio-tungstenite`.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide number for one accepted socket. The server reuses it as
/// the player's identity, so it is never zero and never handed out twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next unused id.
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// A listening endpoint.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Resolves once a client has connected and finished any handshake.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// One player's socket.
///
/// The handler reads requests in its own loop while broadcasts for the
/// same player are written by a separate task, so implementations must
/// not let a pending `recv` hold up `send`.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    async fn send(&self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Next inbound frame, or `Ok(None)` once the peer has hung up.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}
