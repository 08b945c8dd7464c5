use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError};
use crate::message::Message;

/// Frame header: version (1) + msg_type (1) + payload_len (2) + token (64) = 68 bytes.
pub const HEADER_SIZE: usize = 68;

/// Width of the header's session token field.
pub const SESSION_TOKEN_SIZE: usize = 64;

/// Protocol version spoken by this crate.
pub const PROTOCOL_VERSION: u8 = 1;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// 64-byte opaque session identifier; all zeros when there is no session.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken([u8; SESSION_TOKEN_SIZE]);

impl SessionToken {
    /// The "no session" token.
    pub const ZERO: Self = Self([0u8; SESSION_TOKEN_SIZE]);

    pub const fn new(bytes: [u8; SESSION_TOKEN_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build a token from a slice that must be exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EncodeError> {
        let token: [u8; SESSION_TOKEN_SIZE] =
            bytes.try_into().map_err(|_| EncodeError::FieldLength {
                field: "session_token",
                expected: SESSION_TOKEN_SIZE,
                got: bytes.len(),
            })?;
        Ok(Self(token))
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; SESSION_TOKEN_SIZE] {
        &self.0
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_zero() {
            f.write_str("SessionToken(<none>)")
        } else {
            f.write_str("SessionToken(<redacted>)")
        }
    }
}

/// The fixed preamble of every request and response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Protocol version. Not validated on decode.
    pub version: u8,
    /// Message kind, see [`crate::kind`].
    pub msg_type: u8,
    /// Length in bytes of the payload that follows.
    pub payload_len: u16,
    /// Session token, zero when absent.
    pub session_token: SessionToken,
}

impl Header {
    /// Create a header for the current protocol version.
    pub fn new(msg_type: u8, payload_len: u16, session_token: SessionToken) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            msg_type,
            payload_len,
            session_token,
        }
    }

    /// Payload length as a buffer size.
    pub fn payload_size(&self) -> usize {
        usize::from(self.payload_len)
    }

    /// Append the wire form of this header to `dst`.
    ///
    /// Wire format:
    /// ```text
    /// ┌─────────┬──────────┬─────────────┬──────────────────┐
    /// │ Version │ Msg type │ Payload len │ Session token    │
    /// │ (1B)    │ (1B)     │ (2B LE)     │ (64B)            │
    /// └─────────┴──────────┴─────────────┴──────────────────┘
    /// ```
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_u8(self.version);
        dst.put_u8(self.msg_type);
        dst.put_u16_le(self.payload_len);
        dst.put_slice(self.session_token.as_bytes());
    }

    /// The wire form of this header.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        let mut cursor = &mut out[..];
        cursor.put_u8(self.version);
        cursor.put_u8(self.msg_type);
        cursor.put_u16_le(self.payload_len);
        cursor.put_slice(self.session_token.as_bytes());
        out
    }

    /// Decode a header from the first [`HEADER_SIZE`] bytes of `src`.
    ///
    /// Any byte pattern is a structurally valid header. Bytes past the header
    /// are not looked at.
    pub fn decode(src: &[u8]) -> Result<Self, DecodeError> {
        if src.len() < HEADER_SIZE {
            return Err(DecodeError::Truncated {
                what: "header",
                expected: HEADER_SIZE,
                got: src.len(),
            });
        }

        let mut buf = &src[..HEADER_SIZE];
        let version = buf.get_u8();
        let msg_type = buf.get_u8();
        let payload_len = buf.get_u16_le();
        let mut token = [0u8; SESSION_TOKEN_SIZE];
        buf.copy_to_slice(&mut token);

        Ok(Self {
            version,
            msg_type,
            payload_len,
            session_token: SessionToken(token),
        })
    }
}

/// Pack header fields into their 68-byte wire form.
///
/// Fails if `session_token` is not exactly 64 bytes or `payload_len` does not
/// fit in 16 bits.
pub fn encode_header(
    version: u8,
    msg_type: u8,
    payload_len: usize,
    session_token: &[u8],
) -> Result<[u8; HEADER_SIZE], EncodeError> {
    let payload_len = checked_payload_len(payload_len)?;
    let session_token = SessionToken::from_slice(session_token)?;
    Ok(Header {
        version,
        msg_type,
        payload_len,
        session_token,
    }
    .to_bytes())
}

/// Unpack a header. Fails only when fewer than 68 bytes are supplied.
pub fn decode_header(src: &[u8]) -> Result<Header, DecodeError> {
    Header::decode(src)
}

/// Encode a typed request as a complete frame (header + payload).
pub fn encode_frame(
    message: &Message,
    session_token: &SessionToken,
    dst: &mut BytesMut,
) -> Result<(), EncodeError> {
    let payload_len = checked_payload_len(message.payload_len())?;
    let header = Header::new(message.msg_type(), payload_len, *session_token);
    dst.reserve(HEADER_SIZE + message.payload_len());
    header.encode(dst);
    message.encode_payload(dst);
    Ok(())
}

/// Encode an arbitrary payload as a complete frame.
pub fn encode_raw_frame(
    version: u8,
    msg_type: u8,
    session_token: &SessionToken,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<(), EncodeError> {
    let payload_len = checked_payload_len(payload.len())?;
    let header = Header {
        version,
        msg_type,
        payload_len,
        session_token: *session_token,
    };
    dst.reserve(HEADER_SIZE + payload.len());
    header.encode(dst);
    dst.put_slice(payload);
    Ok(())
}

pub(crate) fn checked_payload_len(len: usize) -> Result<u16, EncodeError> {
    u16::try_from(len).map_err(|_| EncodeError::PayloadTooLarge {
        size: len,
        max: MAX_PAYLOAD,
    })
}

/// A frame as read off the wire, payload not yet interpreted.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub header: Header,
    pub payload: Bytes,
}

impl RawFrame {
    /// Create a frame for the current protocol version.
    pub fn new(
        msg_type: u8,
        session_token: SessionToken,
        payload: impl Into<Bytes>,
    ) -> Result<Self, EncodeError> {
        let payload = payload.into();
        let payload_len = checked_payload_len(payload.len())?;
        Ok(Self {
            header: Header::new(msg_type, payload_len, session_token),
            payload,
        })
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Configuration for blocking frame I/O.
#[derive(Debug, Clone, Default)]
pub struct FrameConfig {
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}
