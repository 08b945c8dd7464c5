/// A value could not be represented in the fixed wire layout.
///
/// Raised before any I/O happens; the caller can fix the input and retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// A text or opaque field is larger than its fixed width.
    #[error("{field} is {len} bytes, exceeds fixed width of {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// An opaque field must be exactly its fixed width.
    #[error("{field} must be exactly {expected} bytes, got {got}")]
    FieldLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    /// The payload does not fit the header's 16-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

/// Bytes could not be mapped back to a typed value.
///
/// Only byte accounting fails here. Unknown versions, message types and error
/// codes decode fine and are left to the caller to judge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Fewer bytes than the fixed-size structure needs.
    #[error("truncated {what} ({got} bytes, need {expected})")]
    Truncated {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// The buffer length disagrees with the length declared for it.
    #[error("payload length mismatch (declared {declared}, got {got})")]
    LengthMismatch { declared: usize, got: usize },

    /// The payload length does not match the message kind's fixed layout.
    #[error("payload for message type {msg_type} must be {expected} bytes, got {got}")]
    PayloadLength {
        msg_type: u8,
        expected: usize,
        got: usize,
    },

    /// A note body's `content_len` disagrees with the bytes that follow it.
    #[error("content length mismatch (declared {declared}, got {got})")]
    ContentLength { declared: usize, got: usize },

    /// No typed request layout exists for this message type.
    #[error("unknown request message type {0}")]
    UnknownMessageType(u8),
}

/// Errors that can occur while moving frames over a stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The outgoing frame could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The incoming frame could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream closed before the expected number of bytes arrived.
    #[error("short read: stream closed after {got} of {expected} bytes")]
    ShortRead { expected: usize, got: usize },

    /// The peer stopped accepting bytes mid-frame.
    #[error("connection closed (incomplete frame written)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
