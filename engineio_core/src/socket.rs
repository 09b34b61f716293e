//! Per-session state: identity, the swappable transport slot, and the
//! application-visible message queues.

use core::fmt;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use rand::{RngCore, rngs::OsRng};
use tokio::sync::RwLock;

use crate::error::SessionClosed;
use crate::transport::Transport;

/// A session identifier.
///
/// Generated as 15 bytes from the OS CSPRNG, each masked to `[0, 63]`,
/// then Base64-encoded to 20 ASCII characters. The byte range makes the
/// token biased relative to plain Base64 of full-range bytes; it predates
/// this implementation and is kept bit-for-bit for wire compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random session ID.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 15];
        OsRng.fill_bytes(&mut bytes);
        for byte in &mut bytes {
            *byte &= 0x3f;
        }
        Self(STANDARD.encode(bytes))
    }

    /// The ID as its 20-character string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One logical client ↔ server channel, identified by its [`SessionId`].
///
/// The `incoming`/`outgoing` queues are the application surface; they
/// carry opaque message bytes and survive transport changes. The
/// transport slot holds the packet-level queues of the current carrier
/// and is replaced atomically on upgrade.
#[derive(Debug)]
pub struct Socket {
    id: SessionId,
    transport: RwLock<Transport>,
    incoming_tx: async_channel::Sender<Bytes>,
    incoming_rx: async_channel::Receiver<Bytes>,
    outgoing_tx: async_channel::Sender<Bytes>,
    outgoing_rx: async_channel::Receiver<Bytes>,
}

impl Socket {
    /// Build a socket over a fresh polling transport.
    pub(crate) fn new(id: SessionId) -> Arc<Self> {
        let (incoming_tx, incoming_rx) = async_channel::unbounded();
        let (outgoing_tx, outgoing_rx) = async_channel::unbounded();
        Arc::new(Self {
            id,
            transport: RwLock::new(Transport::polling()),
            incoming_tx,
            incoming_rx,
            outgoing_tx,
            outgoing_rx,
        })
    }

    /// The immutable session ID.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Wait for the next message from the client.
    ///
    /// Cancel-safe: the returned future may be raced against other
    /// sockets or shutdown signals in a `select!` without losing
    /// messages.
    ///
    /// # Errors
    ///
    /// Fails once the session is torn down.
    pub async fn recv(&self) -> Result<Bytes, SessionClosed> {
        self.incoming_rx.recv().await.map_err(|_| SessionClosed)
    }

    /// Queue a message for the client. Never blocks.
    ///
    /// # Errors
    ///
    /// Fails once the session is torn down.
    pub fn send(&self, data: impl Into<Bytes>) -> Result<(), SessionClosed> {
        self.outgoing_tx
            .try_send(data.into())
            .map_err(|_| SessionClosed)
    }

    /// Snapshot the current transport (shares its queues).
    pub(crate) async fn current_transport(&self) -> Transport {
        self.transport.read().await.clone()
    }

    /// Swap in a new transport. The upgrade handler is the only writer.
    pub(crate) async fn replace_transport(&self, transport: Transport) {
        *self.transport.write().await = transport;
    }

    pub(crate) fn push_incoming(&self, data: Bytes) -> Result<(), SessionClosed> {
        self.incoming_tx.try_send(data).map_err(|_| SessionClosed)
    }

    pub(crate) async fn next_outgoing(&self) -> Result<Bytes, SessionClosed> {
        self.outgoing_rx.recv().await.map_err(|_| SessionClosed)
    }

    /// Close every queue, waking blocked readers. Queued data is discarded.
    pub(crate) async fn close(&self) {
        self.incoming_tx.close();
        self.outgoing_tx.close();
        self.transport.read().await.close();
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_twenty_base64_chars() {
        for _ in 0..64 {
            let id = SessionId::generate();
            assert_eq!(id.as_str().len(), 20);
            assert!(
                id.as_str()
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
            );
        }
    }

    #[test]
    fn session_ids_are_distinct() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn messages_flow_in_fifo_order() {
        let socket = Socket::new(SessionId::generate());

        socket.send(&b"one"[..]).expect("send");
        socket.send(&b"two"[..]).expect("send");
        assert_eq!(socket.next_outgoing().await.expect("recv").as_ref(), b"one");
        assert_eq!(socket.next_outgoing().await.expect("recv").as_ref(), b"two");

        socket.push_incoming(Bytes::from_static(b"hi")).expect("push");
        assert_eq!(socket.recv().await.expect("recv").as_ref(), b"hi");
    }

    #[tokio::test]
    async fn recv_composes_in_select() {
        let a = Socket::new(SessionId::generate());
        let b = Socket::new(SessionId::generate());
        b.push_incoming(Bytes::from_static(b"from b")).expect("push");

        let got = tokio::select! {
            msg = a.recv() => ("a", msg.expect("recv")),
            msg = b.recv() => ("b", msg.expect("recv")),
        };
        assert_eq!(got.0, "b");
        assert_eq!(got.1.as_ref(), b"from b");
    }

    #[tokio::test]
    async fn close_fails_both_directions() {
        let socket = Socket::new(SessionId::generate());
        socket.close().await;
        assert!(socket.recv().await.is_err());
        assert!(socket.send(&b"late"[..]).is_err());
    }
}
