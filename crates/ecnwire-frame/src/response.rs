//! Response payload: error code plus variable-length result data.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::codec::checked_payload_len;
use crate::error::{DecodeError, EncodeError};

/// Envelope prefix: error_code (1) + data_len (4).
pub const RESPONSE_ENVELOPE_SIZE: usize = 5;

/// Result code carried in the first response byte.
///
/// Every byte decodes; values this crate does not know map to [`ErrorCode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    None,
    AuthFailed,
    UserExists,
    InvalidToken,
    NotFound,
    Server,
    InvalidRequest,
    VersionMismatch,
    InvalidSession,
    Unknown(u8),
}

impl ErrorCode {
    pub fn is_success(self) -> bool {
        self == ErrorCode::None
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::None => "none",
            ErrorCode::AuthFailed => "auth failed",
            ErrorCode::UserExists => "user exists",
            ErrorCode::InvalidToken => "invalid token",
            ErrorCode::NotFound => "not found",
            ErrorCode::Server => "server error",
            ErrorCode::InvalidRequest => "invalid request",
            ErrorCode::VersionMismatch => "version mismatch",
            ErrorCode::InvalidSession => "invalid session",
            ErrorCode::Unknown(_) => "unknown",
        }
    }
}

impl From<u8> for ErrorCode {
    fn from(code: u8) -> Self {
        match code {
            0 => ErrorCode::None,
            1 => ErrorCode::AuthFailed,
            2 => ErrorCode::UserExists,
            3 => ErrorCode::InvalidToken,
            4 => ErrorCode::NotFound,
            5 => ErrorCode::Server,
            6 => ErrorCode::InvalidRequest,
            7 => ErrorCode::VersionMismatch,
            8 => ErrorCode::InvalidSession,
            other => ErrorCode::Unknown(other),
        }
    }
}

impl From<ErrorCode> for u8 {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::None => 0,
            ErrorCode::AuthFailed => 1,
            ErrorCode::UserExists => 2,
            ErrorCode::InvalidToken => 3,
            ErrorCode::NotFound => 4,
            ErrorCode::Server => 5,
            ErrorCode::InvalidRequest => 6,
            ErrorCode::VersionMismatch => 7,
            ErrorCode::InvalidSession => 8,
            ErrorCode::Unknown(other) => other,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", u8::from(*self), self.name())
    }
}

/// A structured response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub error_code: ErrorCode,
    /// `data_len` as the peer declared it, before clipping.
    pub declared_len: u32,
    /// Result data, clipped to the bytes actually present in the payload.
    pub data: Bytes,
}

impl ResponseEnvelope {
    pub fn is_success(&self) -> bool {
        self.error_code.is_success()
    }

    /// True when the peer declared more data than the payload carried.
    pub fn is_clipped(&self) -> bool {
        u64::from(self.declared_len) > self.data.len() as u64
    }
}

/// A decoded response payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Payload long enough to hold the envelope.
    Envelope(ResponseEnvelope),
    /// Payload shorter than the envelope (including empty); raw bytes kept
    /// for diagnostics.
    NoBody(Bytes),
}

impl Response {
    pub fn envelope(&self) -> Option<&ResponseEnvelope> {
        match self {
            Response::Envelope(envelope) => Some(envelope),
            Response::NoBody(_) => None,
        }
    }

    /// True only for a structured response with error code 0.
    pub fn is_success(&self) -> bool {
        self.envelope().is_some_and(ResponseEnvelope::is_success)
    }
}

/// Decode a response payload whose length the header declared as `payload_len`.
///
/// `payload.len()` must equal `payload_len`. Payloads shorter than the
/// 5-byte envelope come back as [`Response::NoBody`]. Otherwise data is taken
/// as `min(data_len, payload_len - 5)` bytes; a larger declared length is
/// clipped, never rejected.
pub fn decode_response_payload(
    payload: Bytes,
    payload_len: usize,
) -> Result<Response, DecodeError> {
    if payload.len() != payload_len {
        return Err(DecodeError::LengthMismatch {
            declared: payload_len,
            got: payload.len(),
        });
    }

    if payload_len < RESPONSE_ENVELOPE_SIZE {
        debug!(payload_len, "response payload too short for envelope");
        return Ok(Response::NoBody(payload));
    }

    let mut head = &payload[..RESPONSE_ENVELOPE_SIZE];
    let error_code = ErrorCode::from(head.get_u8());
    // data_len is big-endian even though the header's payload_len is
    // little-endian. The protocol defines it that way; do not normalize.
    let declared_len = head.get_u32();

    let available = payload_len - RESPONSE_ENVELOPE_SIZE;
    let take = available.min(declared_len as usize);
    if (declared_len as usize) > available {
        warn!(
            declared_len,
            available, "response data_len exceeds payload; clipping"
        );
    }
    let data = payload.slice(RESPONSE_ENVELOPE_SIZE..RESPONSE_ENVELOPE_SIZE + take);

    Ok(Response::Envelope(ResponseEnvelope {
        error_code,
        declared_len,
        data,
    }))
}

/// Append a response payload (`error_code || data_len BE || data`) to `dst`.
pub fn encode_response_payload(
    error_code: ErrorCode,
    data: &[u8],
    dst: &mut BytesMut,
) -> Result<(), EncodeError> {
    checked_payload_len(RESPONSE_ENVELOPE_SIZE + data.len())?;
    dst.reserve(RESPONSE_ENVELOPE_SIZE + data.len());
    dst.put_u8(error_code.into());
    dst.put_u32(data.len() as u32);
    dst.put_slice(data);
    Ok(())
}
