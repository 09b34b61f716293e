//! The unit of Engine.IO framing: a type tag plus an opaque body.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::DecodeError;

/// The seven Engine.IO packet types, with wire ordinals `0..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Server → client session handshake.
    Open,
    /// Either side ends the session.
    Close,
    /// Client-initiated heartbeat (also the upgrade probe).
    Ping,
    /// Heartbeat answer.
    Pong,
    /// Application data.
    Message,
    /// Client commits the transport upgrade.
    Upgrade,
    /// Server-side filler used to flush a pending poll.
    Noop,
}

impl PacketType {
    pub(crate) const fn to_digit(self) -> u8 {
        match self {
            Self::Open => b'0',
            Self::Close => b'1',
            Self::Ping => b'2',
            Self::Pong => b'3',
            Self::Message => b'4',
            Self::Upgrade => b'5',
            Self::Noop => b'6',
        }
    }

    pub(crate) const fn from_digit(byte: u8) -> Result<Self, DecodeError> {
        match byte {
            b'0' => Ok(Self::Open),
            b'1' => Ok(Self::Close),
            b'2' => Ok(Self::Ping),
            b'3' => Ok(Self::Pong),
            b'4' => Ok(Self::Message),
            b'5' => Ok(Self::Upgrade),
            b'6' => Ok(Self::Noop),
            _ => Err(DecodeError::UnknownPacketType { byte }),
        }
    }
}

/// A single Engine.IO packet.
///
/// The body is opaque to this layer; `MESSAGE` bodies belong to the
/// application, the rest to the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// The packet type.
    pub packet_type: PacketType,
    /// The packet body; may be empty.
    pub data: Bytes,
}

impl Packet {
    /// Create a packet of the given type.
    #[must_use]
    pub fn new(packet_type: PacketType, data: impl Into<Bytes>) -> Self {
        Self {
            packet_type,
            data: data.into(),
        }
    }

    /// A `MESSAGE` packet carrying application data.
    #[must_use]
    pub fn message(data: impl Into<Bytes>) -> Self {
        Self::new(PacketType::Message, data)
    }

    /// A `PONG` packet echoing the ping body.
    #[must_use]
    pub fn pong(data: impl Into<Bytes>) -> Self {
        Self::new(PacketType::Pong, data)
    }

    /// An empty `CLOSE` packet.
    #[must_use]
    pub fn close() -> Self {
        Self::new(PacketType::Close, Bytes::new())
    }

    /// An empty `NOOP` packet.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(PacketType::Noop, Bytes::new())
    }

    /// Wire length: type digit plus body.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        1 + self.data.len()
    }

    /// Encode as wire bytes: one ASCII type digit followed by the body.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u8(self.packet_type.to_digit());
        buf.extend_from_slice(&self.data);
        buf.freeze()
    }

    /// Parse a packet from wire bytes.
    ///
    /// # Errors
    ///
    /// Fails on empty input or an unknown type digit.
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        let (&first, rest) = bytes.split_first().ok_or(DecodeError::EmptyPacket)?;
        Ok(Self {
            packet_type: PacketType::from_digit(first)?,
            data: Bytes::copy_from_slice(rest),
        })
    }
}
