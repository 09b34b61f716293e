//! The physical carrier beneath a session.
//!
//! A [`Transport`] is a pair of unbounded packet queues: `inbound`
//! (client → server, fed by POST bodies or WebSocket frames) and
//! `outbound` (server → client, drained by polls or the WebSocket
//! writer). The queues are MPMC, so cloning a transport — or building a
//! WebSocket transport over a polling one — shares the underlying
//! buffers rather than copying them.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SessionClosed;
use crate::packet::Packet;

/// Which carrier a [`Transport`] runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// HTTP long-polling.
    Polling,
    /// WebSocket.
    Websocket,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polling => f.write_str("polling"),
            Self::Websocket => f.write_str("websocket"),
        }
    }
}

/// The `transport` query parameter named no known transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown transport name")]
pub struct UnknownTransport;

impl FromStr for TransportKind {
    type Err = UnknownTransport;

    // Case-sensitive exact match; anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "polling" => Ok(Self::Polling),
            "websocket" => Ok(Self::Websocket),
            _ => Err(UnknownTransport),
        }
    }
}

/// Packet-level queues for one carrier.
///
/// Clones share the same queues.
#[derive(Debug, Clone)]
pub struct Transport {
    kind: TransportKind,
    inbound_tx: async_channel::Sender<Packet>,
    inbound_rx: async_channel::Receiver<Packet>,
    outbound_tx: async_channel::Sender<Packet>,
    outbound_rx: async_channel::Receiver<Packet>,
}

impl Transport {
    /// A fresh polling transport with empty queues.
    #[must_use]
    pub(crate) fn polling() -> Self {
        let (inbound_tx, inbound_rx) = async_channel::unbounded();
        let (outbound_tx, outbound_rx) = async_channel::unbounded();
        Self {
            kind: TransportKind::Polling,
            inbound_tx,
            inbound_rx,
            outbound_tx,
            outbound_rx,
        }
    }

    /// A WebSocket transport layered over an existing polling transport.
    ///
    /// The inbound queue is *shared* with `self`: packets already queued,
    /// and packets still being appended by an in-flight POST, are each
    /// observed exactly once by whichever receiver survives the upgrade
    /// commit. The outbound queue is fresh — anything left on the polling
    /// side belongs to the final poll response.
    #[must_use]
    pub(crate) fn websocket_sharing_inbound(&self) -> Self {
        let (outbound_tx, outbound_rx) = async_channel::unbounded();
        Self {
            kind: TransportKind::Websocket,
            inbound_tx: self.inbound_tx.clone(),
            inbound_rx: self.inbound_rx.clone(),
            outbound_tx,
            outbound_rx,
        }
    }

    /// The carrier this transport runs over.
    #[must_use]
    pub const fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Append a client packet to the inbound queue.
    ///
    /// # Errors
    ///
    /// Fails if the session is being torn down.
    pub(crate) async fn send_inbound(&self, packet: Packet) -> Result<(), SessionClosed> {
        self.inbound_tx.send(packet).await.map_err(|_| SessionClosed)
    }

    /// Wait for the next client packet. Cancel-safe.
    pub(crate) async fn recv_inbound(&self) -> Result<Packet, SessionClosed> {
        self.inbound_rx.recv().await.map_err(|_| SessionClosed)
    }

    /// Queue a packet for the client. Never blocks; the queue is unbounded.
    pub(crate) fn enqueue_outbound(&self, packet: Packet) -> Result<(), SessionClosed> {
        self.outbound_tx.try_send(packet).map_err(|_| SessionClosed)
    }

    /// Wait for the next packet destined for the client. Cancel-safe.
    pub(crate) async fn recv_outbound(&self) -> Result<Packet, SessionClosed> {
        self.outbound_rx.recv().await.map_err(|_| SessionClosed)
    }

    /// Take an already-queued outbound packet, if any.
    pub(crate) fn try_recv_outbound(&self) -> Option<Packet> {
        self.outbound_rx.try_recv().ok()
    }

    /// Close both queues, waking all blocked readers and writers.
    pub(crate) fn close(&self) {
        self.inbound_tx.close();
        self.outbound_tx.close();
    }
}
