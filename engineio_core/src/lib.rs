//! # Engine.IO server core
//!
//! A bidirectional, framed message channel between a browser client and a
//! server that starts on HTTP long-polling and transparently upgrades to a
//! WebSocket, preserving message order and session identity across the
//! switch.
//!
//! # Protocol
//!
//! Every HTTP request hits a single endpoint and is routed on its query
//! string:
//!
//! | Query                          | Method | Purpose                           |
//! |--------------------------------|--------|-----------------------------------|
//! | `?transport=polling`           | GET    | Open a new session                |
//! | `?transport=polling&sid=…`     | GET    | Long-poll for outbound packets    |
//! | `?transport=polling&sid=…`     | POST   | Deliver a payload of packets      |
//! | `?transport=websocket&sid=…`   | GET    | Upgrade the session to WebSocket  |
//!
//! Packets are framed as one ASCII type digit (`0`–`6`) followed by an
//! opaque body; polling responses bundle packets into a length-prefixed
//! [`Payload`]. See [`packet`] and [`payload`] for the wire format.
//!
//! # Architecture
//!
//! ```text
//!  POST body / WS frame ──► transport.inbound ──┐
//!                                               ▼
//!                                         session pump          application
//!                                        (one per session) ──►  socket.recv()
//!  GET response / WS frame ◄── transport.outbound ◄── socket.send()
//! ```
//!
//! Each session owns two application-visible queues (`incoming`,
//! `outgoing`) that survive transport changes, plus a swappable
//! [`Transport`] slot holding the packet-level queues of the current
//! carrier. A per-session pump task ([`brain`]) translates between the
//! two levels and answers protocol packets.
//!
//! The core never touches a socket or an HTTP library directly: hosts
//! provide a [`ServerApi`] per request and a [`WsStream`] per accepted
//! WebSocket.

pub mod brain;
pub mod config;
pub mod error;
pub mod packet;
pub mod payload;
pub mod polling;
pub mod registry;
pub mod server;
pub mod socket;
pub mod transport;
pub mod upgrade;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::EngineIoConfig;
pub use error::{DecodeError, EngineIoError, SessionClosed, WsError};
pub use packet::{Packet, PacketType};
pub use payload::Payload;
pub use registry::Registry;
pub use server::{EngineIo, EngineResponse, ServerApi};
pub use socket::{SessionId, Socket};
pub use transport::{Transport, TransportKind};
pub use upgrade::{WsMessage, WsStream};
