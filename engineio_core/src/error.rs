//! Error types for the Engine.IO core.

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced to clients over HTTP.
///
/// Every variant maps to status 400 with an `application/json` body of the
/// form `{"code": <n>, "message": <string>}`; the codes are fixed by the
/// protocol and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineIoError {
    /// The `transport` query parameter is missing or names no known transport.
    #[error("Transport unknown")]
    TransportUnknown,

    /// The `sid` query parameter is malformed or names no live session.
    #[error("Session ID unknown")]
    SessionIdUnknown,

    /// Anything else: unparsable payload, wrong method, wrong transport
    /// combination.
    #[error("Bad request")]
    BadRequest,
}

impl EngineIoError {
    /// The protocol-level error code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::TransportUnknown => 0,
            Self::SessionIdUnknown => 1,
            Self::BadRequest => 3,
        }
    }

    /// The JSON response body for this error.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn to_json(self) -> Vec<u8> {
        let body = ErrorBody {
            code: self.code(),
            message: self.to_string(),
        };
        serde_json::to_vec(&body).expect("error body encodes")
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: u8,
    message: String,
}

/// Errors that can occur while decoding packets and payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A packet needs at least its type byte.
    #[error("empty packet")]
    EmptyPacket,

    /// The type byte is outside `'0'..='6'`.
    #[error("unknown packet type {byte:#04x}")]
    UnknownPacketType {
        /// The offending type byte.
        byte: u8,
    },

    /// A payload must contain at least one frame.
    #[error("empty payload")]
    EmptyPayload,

    /// A frame must start with the `0x00` marker.
    #[error("expected frame marker 0x00, got {byte:#04x}")]
    MissingFrameMarker {
        /// The byte found instead of the marker.
        byte: u8,
    },

    /// A length digit must be a byte value in `0..=9`.
    #[error("length digit out of range: {byte:#04x}")]
    InvalidLengthDigit {
        /// The offending digit byte.
        byte: u8,
    },

    /// The input ended before the `0xff` length terminator.
    #[error("length prefix missing 0xff separator")]
    MissingLengthSeparator,

    /// The length prefix exceeds the allowed digit count.
    #[error("length prefix too long: {digits} digits")]
    LengthPrefixTooLong {
        /// Number of digit bytes found.
        digits: usize,
    },

    /// The declared length does not fit in `usize`.
    #[error("declared packet length does not fit in usize")]
    LengthOverflow,

    /// The body is shorter than the declared packet length.
    #[error("payload truncated: declared {declared} bytes, have {have}")]
    Truncated {
        /// Length declared by the frame prefix.
        declared: usize,
        /// Bytes actually remaining.
        have: usize,
    },
}

/// The session is being torn down; its queues are closed.
#[derive(Debug, Clone, Copy, Error)]
#[error("session closed")]
pub struct SessionClosed;

/// WebSocket transport failure reported by the host integration.
#[derive(Debug, Error)]
#[error("websocket transport error: {0}")]
pub struct WsError(pub String);
