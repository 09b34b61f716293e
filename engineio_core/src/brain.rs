//! The per-session pump between packet-level and message-level queues.
//!
//! One task per session. Each iteration re-reads the socket's transport
//! slot, then makes a single cancel-safe choice between the next inbound
//! packet and the next outbound application message, so the pump follows
//! a transport upgrade without being respawned. It never performs I/O —
//! only in-process queues.

use std::sync::Arc;

use crate::packet::{Packet, PacketType};
use crate::registry::Registry;
use crate::socket::Socket;

/// Run a session's pump until the session ends.
///
/// Terminates when a `CLOSE` packet is consumed (removing the session
/// from the registry) or when any session queue closes underneath it.
pub(crate) async fn run(registry: Registry, socket: Arc<Socket>) {
    let sid = socket.id().clone();
    tracing::debug!(%sid, "session pump started");

    loop {
        let transport = socket.current_transport().await;

        tokio::select! {
            packet = transport.recv_inbound() => {
                let Ok(packet) = packet else { break };
                match packet.packet_type {
                    PacketType::Message => {
                        if socket.push_incoming(packet.data).is_err() {
                            break;
                        }
                    }
                    PacketType::Ping => {
                        // Answer on whatever transport is current *now*;
                        // the slot may have been swapped while we waited.
                        let current = socket.current_transport().await;
                        if current.enqueue_outbound(Packet::pong(packet.data)).is_err() {
                            break;
                        }
                    }
                    PacketType::Close => {
                        tracing::info!(%sid, "close received, ending session");
                        registry.remove(&sid).await;
                        break;
                    }
                    other => {
                        tracing::trace!(%sid, packet_type = ?other, "discarding packet");
                    }
                }
            }
            message = socket.next_outgoing() => {
                let Ok(data) = message else { break };
                let current = socket.current_transport().await;
                if current.enqueue_outbound(Packet::message(data)).is_err() {
                    break;
                }
            }
        }
    }

    socket.close().await;
    tracing::debug!(%sid, "session pump stopped");
}
