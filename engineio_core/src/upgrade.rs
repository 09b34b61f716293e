//! Polling → WebSocket upgrade: probe handshake, atomic transport swap,
//! and the bidirectional frame pump.
//!
//! ```text
//! client                                   server
//!   │   PING "probe"   ──────────────────►   │  (1) probe in
//!   │   ◄──────────────────   PONG "probe"   │  (2) probe out
//!   │                                        │  (3) NOOP flushes any pending
//!   │                                        │      poll; inbound duplicated
//!   │   UPGRADE ""     ──────────────────►   │  (4) completion
//!   │                                        │  (5) transport slot swapped
//!   │   ◄──────── text frames ────────────►  │      writer task + reader loop
//! ```
//!
//! Any deviation before (5) aborts the handshake and leaves the polling
//! transport in place. After (5), the reader loop exiting for any reason
//! injects a synthetic `CLOSE` so the session pump tears the session
//! down, and the writer task is cancelled.

use std::sync::Arc;

use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};

use crate::error::WsError;
use crate::packet::{Packet, PacketType};
use crate::registry::Registry;
use crate::socket::Socket;
use crate::transport::Transport;

/// A data message on an accepted WebSocket connection.
///
/// Control frames (ping/pong) never surface here; the host's framing
/// layer answers them itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    /// A text frame; carries one encoded packet in this protocol version.
    Text(String),
    /// A binary frame; logged and skipped in this protocol version.
    Binary(Bytes),
    /// The peer closed the connection.
    Close,
}

/// An accepted WebSocket connection, as provided by the host.
pub trait WsStream:
    Stream<Item = Result<WsMessage, WsError>>
    + Sink<WsMessage, Error = WsError>
    + Send
    + Unpin
    + 'static
{
}

impl<T> WsStream for T where
    T: Stream<Item = Result<WsMessage, WsError>>
        + Sink<WsMessage, Error = WsError>
        + Send
        + Unpin
        + 'static
{
}

/// Drive one upgrade attempt and, if it commits, the WebSocket side of
/// the session until the client goes away.
pub(crate) async fn run<W: WsStream>(registry: Registry, socket: Arc<Socket>, mut ws: W) {
    let sid = socket.id().clone();

    // (1) probe in
    match next_packet(&mut ws).await {
        Some(packet)
            if packet.packet_type == PacketType::Ping && packet.data.as_ref() == b"probe" => {}
        other => {
            tracing::debug!(%sid, packet = ?other, "bad probe, keeping polling transport");
            return;
        }
    }

    // (2) probe out
    if send_packet(&mut ws, &Packet::pong(&b"probe"[..])).await.is_err() {
        return;
    }

    // (3) flush any pending poll and duplicate the inbound queue, so
    // packets the client sends between probe and commit survive.
    let polling = socket.current_transport().await;
    let _ = polling.enqueue_outbound(Packet::noop());
    let upgraded = polling.websocket_sharing_inbound();

    // (4) completion
    match next_packet(&mut ws).await {
        Some(packet)
            if packet.packet_type == PacketType::Upgrade && packet.data.is_empty() => {}
        other => {
            tracing::debug!(%sid, packet = ?other, "upgrade not completed, aborting");
            return;
        }
    }

    // (5) commit
    socket.replace_transport(upgraded.clone()).await;
    tracing::info!(%sid, "transport upgraded to websocket");

    let (ws_tx, ws_rx) = ws.split();
    let writer = tokio::spawn(write_frames(upgraded.clone(), ws_tx));

    read_frames(&upgraded, ws_rx).await;

    // Reader gone for whatever reason: let the session pump observe a
    // clean shutdown and remove the session.
    let _ = upgraded.send_inbound(Packet::close()).await;
    writer.abort();
    tracing::debug!(%sid, "websocket connection finished");
}

/// Writer task: outbound queue → text frames.
async fn write_frames<S>(transport: Transport, mut ws_tx: S)
where
    S: Sink<WsMessage, Error = WsError> + Send + Unpin,
{
    while let Ok(packet) = transport.recv_outbound().await {
        let frame = String::from_utf8_lossy(&packet.encode()).into_owned();
        if ws_tx.send(WsMessage::Text(frame)).await.is_err() {
            break;
        }
    }
}

/// Reader loop: data frames → inbound queue. Returns on close,
/// disconnect, frame error, or an undecodable packet.
async fn read_frames<S>(transport: &Transport, mut ws_rx: S)
where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    loop {
        match ws_rx.next().await {
            Some(Ok(WsMessage::Text(text))) => match Packet::parse(text.as_bytes()) {
                Ok(packet) => {
                    if transport.send_inbound(packet).await.is_err() {
                        break;
                    }
                }
                Err(error) => {
                    tracing::debug!(%error, "undecodable websocket frame");
                    break;
                }
            },
            Some(Ok(WsMessage::Binary(frame))) => {
                tracing::debug!(len = frame.len(), "skipping binary websocket frame");
            }
            Some(Ok(WsMessage::Close)) | None => break,
            Some(Err(error)) => {
                tracing::debug!(%error, "websocket read failed");
                break;
            }
        }
    }
}

/// Receive the next packet during the handshake. Binary frames are
/// skipped; close, disconnect, errors, and undecodable frames all yield
/// `None`.
async fn next_packet<W: WsStream>(ws: &mut W) -> Option<Packet> {
    loop {
        match ws.next().await? {
            Ok(WsMessage::Text(text)) => return Packet::parse(text.as_bytes()).ok(),
            Ok(WsMessage::Binary(frame)) => {
                tracing::debug!(len = frame.len(), "skipping binary frame during handshake");
            }
            Ok(WsMessage::Close) | Err(_) => return None,
        }
    }
}

async fn send_packet<W: WsStream>(ws: &mut W, packet: &Packet) -> Result<(), WsError> {
    let frame = String::from_utf8_lossy(&packet.encode()).into_owned();
    ws.send(WsMessage::Text(frame)).await
}
