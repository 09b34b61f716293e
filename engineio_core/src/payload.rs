//! Polling payload framing: one or more packets in a single HTTP body.
//!
//! ```text
//! frame   := 0x00 len-digits 0xFF packet-bytes
//! payload := frame+
//! ```
//!
//! `len-digits` are byte *values* `0..=9` (not ASCII digits), read as a
//! base-10 number giving the length of `packet-bytes`. At most
//! [`MAX_LENGTH_DIGITS`] digit bytes are accepted.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::DecodeError;
use crate::packet::Packet;

/// Maximum number of digit bytes in a frame's length prefix.
pub const MAX_LENGTH_DIGITS: usize = 319;

/// An ordered, non-empty sequence of packets framed for a polling body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(Vec<Packet>);

impl Payload {
    /// Wrap packets as a payload. Callers supply at least one packet;
    /// an empty payload has no wire form.
    #[must_use]
    pub fn new(packets: Vec<Packet>) -> Self {
        debug_assert!(!packets.is_empty(), "payloads are non-empty");
        Self(packets)
    }

    /// A payload holding a single packet.
    #[must_use]
    pub fn single(packet: Packet) -> Self {
        Self(vec![packet])
    }

    /// The framed packets, in wire order.
    #[must_use]
    pub fn packets(&self) -> &[Packet] {
        &self.0
    }

    /// Consume the payload, yielding its packets in wire order.
    #[must_use]
    pub fn into_packets(self) -> Vec<Packet> {
        self.0
    }

    /// Encode the payload as a polling response body.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        for packet in &self.0 {
            buf.put_u8(0x00);
            for digit in packet.encoded_len().to_string().bytes() {
                buf.put_u8(digit - b'0');
            }
            buf.put_u8(0xff);
            buf.put_u8(packet.packet_type.to_digit());
            buf.extend_from_slice(&packet.data);
        }
        buf.freeze()
    }

    /// Parse a polling request body into its packets.
    ///
    /// # Errors
    ///
    /// Fails on an empty body, a missing frame marker or length
    /// terminator, digits outside `0..=9`, more than
    /// [`MAX_LENGTH_DIGITS`] digit bytes, or a body shorter than a
    /// frame's declared length.
    pub fn parse(mut input: &[u8]) -> Result<Self, DecodeError> {
        if input.is_empty() {
            return Err(DecodeError::EmptyPayload);
        }

        let mut packets = Vec::new();
        while let Some((&marker, rest)) = input.split_first() {
            if marker != 0x00 {
                return Err(DecodeError::MissingFrameMarker { byte: marker });
            }

            let digits_end = rest
                .iter()
                .position(|&b| b == 0xff)
                .ok_or(DecodeError::MissingLengthSeparator)?;
            if digits_end > MAX_LENGTH_DIGITS {
                return Err(DecodeError::LengthPrefixTooLong { digits: digits_end });
            }

            let mut len: usize = 0;
            for &digit in &rest[..digits_end] {
                if digit > 9 {
                    return Err(DecodeError::InvalidLengthDigit { byte: digit });
                }
                len = len
                    .checked_mul(10)
                    .and_then(|n| n.checked_add(usize::from(digit)))
                    .ok_or(DecodeError::LengthOverflow)?;
            }

            let body = &rest[digits_end + 1..];
            if body.len() < len {
                return Err(DecodeError::Truncated {
                    declared: len,
                    have: body.len(),
                });
            }

            packets.push(Packet::parse(&body[..len])?);
            input = &body[len..];
        }

        Ok(Self(packets))
    }
}

impl From<Packet> for Payload {
    fn from(packet: Packet) -> Self {
        Self::single(packet)
    }
}

impl IntoIterator for Payload {
    type Item = Packet;
    type IntoIter = std::vec::IntoIter<Packet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
