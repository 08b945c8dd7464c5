//! Frame codec for the ECN notes wire protocol.
//!
//! Every message on the wire is a fixed 68-byte header followed by a payload:
//! - 1-byte protocol version
//! - 1-byte message type
//! - 2-byte little-endian payload length
//! - 64-byte session token (zeros when there is no session)
//!
//! Responses carry an envelope of a 1-byte error code and a 4-byte
//! **big-endian** data length followed by the data. Both byte orders are part
//! of the protocol and are kept as-is.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod kind;
pub mod message;
pub mod reader;
pub mod response;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::{
    read_exact_async, read_frame_async, read_response_async, write_message_async, EcnCodec,
};
pub use codec::{
    decode_header, encode_frame, encode_header, encode_raw_frame, FrameConfig, Header, RawFrame,
    SessionToken, HEADER_SIZE, MAX_PAYLOAD, PROTOCOL_VERSION, SESSION_TOKEN_SIZE,
};
pub use error::{DecodeError, EncodeError, FrameError, Result};
pub use kind::{
    is_reply, kind_name, requires_session, ERROR, LOGIN, LOGOUT, NOTE_CREATE, NOTE_DELETE,
    NOTE_GET, NOTE_LIST, NOTE_UPDATE, REGISTER, RESPONSE,
};
pub use message::{
    decode_register_payload, encode_register_payload, LoginRequest, Message, NoteCreateRequest,
    NoteUpdateRequest, RegisterRequest, LOGIN_PAYLOAD_SIZE, NOTE_CREATE_HEADER_SIZE, NOTE_ID_SIZE,
    NOTE_TITLE_SIZE, NOTE_UPDATE_HEADER_SIZE, PASSWORD_SIZE, PUBLIC_KEY_SIZE,
    REGISTER_PAYLOAD_SIZE, USERNAME_SIZE,
};
pub use reader::{read_exact, FrameReader};
pub use response::{
    decode_response_payload, encode_response_payload, ErrorCode, Response, ResponseEnvelope,
    RESPONSE_ENVELOPE_SIZE,
};
pub use writer::FrameWriter;
