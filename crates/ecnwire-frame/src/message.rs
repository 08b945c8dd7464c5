//! Typed request payloads.
//!
//! Every request kind with a fixed payload layout gets its own struct with
//! `encode`/`decode`; [`Message`] ties them to their `msg_type` byte.

use std::borrow::Cow;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError};
use crate::kind::{
    LOGIN, LOGOUT, NOTE_CREATE, NOTE_DELETE, NOTE_GET, NOTE_LIST, NOTE_UPDATE, REGISTER,
};

/// Width of the NUL-padded username field.
pub const USERNAME_SIZE: usize = 32;

/// Width of the NUL-padded password field.
pub const PASSWORD_SIZE: usize = 64;

/// Width of the raw public key field (uncompressed SM2 point).
pub const PUBLIC_KEY_SIZE: usize = 65;

/// REGISTER payload: username (32) + password (64) + public key (65).
pub const REGISTER_PAYLOAD_SIZE: usize = USERNAME_SIZE + PASSWORD_SIZE + PUBLIC_KEY_SIZE;

/// LOGIN payload: username (32) + password (64).
pub const LOGIN_PAYLOAD_SIZE: usize = USERNAME_SIZE + PASSWORD_SIZE;

/// Width of the NUL-padded note title field.
pub const NOTE_TITLE_SIZE: usize = 256;

/// Fixed part of a NOTE_CREATE payload: title (256) + content_len (4).
pub const NOTE_CREATE_HEADER_SIZE: usize = NOTE_TITLE_SIZE + 4;

/// Fixed part of a NOTE_UPDATE payload: id (4) + content_len (4).
pub const NOTE_UPDATE_HEADER_SIZE: usize = 8;

/// NOTE_DELETE and NOTE_GET payload: a bare note id.
pub const NOTE_ID_SIZE: usize = 4;

/// Account registration payload, held in its padded wire form.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    username: [u8; USERNAME_SIZE],
    password: [u8; PASSWORD_SIZE],
    public_key: [u8; PUBLIC_KEY_SIZE],
}

impl RegisterRequest {
    /// Build a request, padding text fields with NUL bytes.
    ///
    /// Fails if the UTF-8 username or password is wider than its field, or
    /// the key is not exactly 65 bytes.
    pub fn new(username: &str, password: &str, public_key: &[u8]) -> Result<Self, EncodeError> {
        let public_key: [u8; PUBLIC_KEY_SIZE] =
            public_key.try_into().map_err(|_| EncodeError::FieldLength {
                field: "public_key",
                expected: PUBLIC_KEY_SIZE,
                got: public_key.len(),
            })?;
        Ok(Self {
            username: pad_text("username", username)?,
            password: pad_text("password", password)?,
            public_key,
        })
    }

    /// Append the 161-byte wire form to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(REGISTER_PAYLOAD_SIZE);
        dst.put_slice(&self.username);
        dst.put_slice(&self.password);
        dst.put_slice(&self.public_key);
    }

    pub fn to_bytes(&self) -> [u8; REGISTER_PAYLOAD_SIZE] {
        let mut out = [0u8; REGISTER_PAYLOAD_SIZE];
        let (user, rest) = out.split_at_mut(USERNAME_SIZE);
        let (pass, key) = rest.split_at_mut(PASSWORD_SIZE);
        user.copy_from_slice(&self.username);
        pass.copy_from_slice(&self.password);
        key.copy_from_slice(&self.public_key);
        out
    }

    /// Decode a payload that must be exactly 161 bytes.
    pub fn decode(src: &[u8]) -> Result<Self, DecodeError> {
        if src.len() != REGISTER_PAYLOAD_SIZE {
            return Err(DecodeError::PayloadLength {
                msg_type: REGISTER,
                expected: REGISTER_PAYLOAD_SIZE,
                got: src.len(),
            });
        }
        let (username, rest) = src.split_at(USERNAME_SIZE);
        let (password, public_key) = rest.split_at(PASSWORD_SIZE);
        Ok(Self {
            username: copy_field(username),
            password: copy_field(password),
            public_key: copy_field(public_key),
        })
    }

    /// The padded username field as sent on the wire.
    pub fn username_bytes(&self) -> &[u8; USERNAME_SIZE] {
        &self.username
    }

    /// The padded password field as sent on the wire.
    pub fn password_bytes(&self) -> &[u8; PASSWORD_SIZE] {
        &self.password
    }

    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.public_key
    }

    /// Username up to the first NUL.
    pub fn username(&self) -> Cow<'_, str> {
        unpad_text(&self.username)
    }

    /// Password up to the first NUL.
    pub fn password(&self) -> Cow<'_, str> {
        unpad_text(&self.password)
    }
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username())
            .field("password", &"<redacted>")
            .field("public_key_len", &self.public_key.len())
            .finish()
    }
}

/// Login payload, held in its padded wire form.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginRequest {
    username: [u8; USERNAME_SIZE],
    password: [u8; PASSWORD_SIZE],
}

impl LoginRequest {
    pub fn new(username: &str, password: &str) -> Result<Self, EncodeError> {
        Ok(Self {
            username: pad_text("username", username)?,
            password: pad_text("password", password)?,
        })
    }

    /// Append the 96-byte wire form to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(LOGIN_PAYLOAD_SIZE);
        dst.put_slice(&self.username);
        dst.put_slice(&self.password);
    }

    pub fn decode(src: &[u8]) -> Result<Self, DecodeError> {
        if src.len() != LOGIN_PAYLOAD_SIZE {
            return Err(DecodeError::PayloadLength {
                msg_type: LOGIN,
                expected: LOGIN_PAYLOAD_SIZE,
                got: src.len(),
            });
        }
        let (username, password) = src.split_at(USERNAME_SIZE);
        Ok(Self {
            username: copy_field(username),
            password: copy_field(password),
        })
    }

    pub fn username(&self) -> Cow<'_, str> {
        unpad_text(&self.username)
    }

    pub fn password(&self) -> Cow<'_, str> {
        unpad_text(&self.password)
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username())
            .field("password", &"<redacted>")
            .finish()
    }
}

/// New note: title, then plaintext content. The server encrypts it.
///
/// `content_len` and the note id are in little-endian order, like the
/// header's `payload_len`.
#[derive(Clone, PartialEq, Eq)]
pub struct NoteCreateRequest {
    title: [u8; NOTE_TITLE_SIZE],
    content: Bytes,
}

impl NoteCreateRequest {
    pub fn new(title: &str, content: impl Into<Bytes>) -> Result<Self, EncodeError> {
        let content = content.into();
        check_content_len(&content)?;
        Ok(Self {
            title: pad_text("title", title)?,
            content,
        })
    }

    pub fn encoded_len(&self) -> usize {
        NOTE_CREATE_HEADER_SIZE + self.content.len()
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_slice(&self.title);
        put_content(&self.content, dst);
    }

    pub fn decode(src: &[u8]) -> Result<Self, DecodeError> {
        if src.len() < NOTE_CREATE_HEADER_SIZE {
            return Err(DecodeError::Truncated {
                what: "note create request",
                expected: NOTE_CREATE_HEADER_SIZE,
                got: src.len(),
            });
        }
        let (title, rest) = src.split_at(NOTE_TITLE_SIZE);
        Ok(Self {
            title: copy_field(title),
            content: take_content(rest)?,
        })
    }

    /// Title up to the first NUL.
    pub fn title(&self) -> Cow<'_, str> {
        unpad_text(&self.title)
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }
}

impl std::fmt::Debug for NoteCreateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteCreateRequest")
            .field("title", &self.title())
            .field("content_len", &self.content.len())
            .finish()
    }
}

/// Replacement content for an existing note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteUpdateRequest {
    pub id: u32,
    content: Bytes,
}

impl NoteUpdateRequest {
    pub fn new(id: u32, content: impl Into<Bytes>) -> Result<Self, EncodeError> {
        let content = content.into();
        check_content_len(&content)?;
        Ok(Self { id, content })
    }

    pub fn encoded_len(&self) -> usize {
        NOTE_UPDATE_HEADER_SIZE + self.content.len()
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_u32_le(self.id);
        put_content(&self.content, dst);
    }

    pub fn decode(mut src: &[u8]) -> Result<Self, DecodeError> {
        if src.len() < NOTE_UPDATE_HEADER_SIZE {
            return Err(DecodeError::Truncated {
                what: "note update request",
                expected: NOTE_UPDATE_HEADER_SIZE,
                got: src.len(),
            });
        }
        let id = src.get_u32_le();
        Ok(Self {
            id,
            content: take_content(src)?,
        })
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }
}

/// A typed request, discriminated by its `msg_type` byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Register(RegisterRequest),
    Login(LoginRequest),
    /// No payload; the header's session token names the session to end.
    Logout,
    NoteCreate(NoteCreateRequest),
    NoteUpdate(NoteUpdateRequest),
    NoteDelete(u32),
    /// No payload; lists the session owner's notes.
    NoteList,
    NoteGet(u32),
}

impl Message {
    pub fn msg_type(&self) -> u8 {
        match self {
            Message::Register(_) => REGISTER,
            Message::Login(_) => LOGIN,
            Message::Logout => LOGOUT,
            Message::NoteCreate(_) => NOTE_CREATE,
            Message::NoteUpdate(_) => NOTE_UPDATE,
            Message::NoteDelete(_) => NOTE_DELETE,
            Message::NoteList => NOTE_LIST,
            Message::NoteGet(_) => NOTE_GET,
        }
    }

    /// Encoded payload length.
    pub fn payload_len(&self) -> usize {
        match self {
            Message::Register(_) => REGISTER_PAYLOAD_SIZE,
            Message::Login(_) => LOGIN_PAYLOAD_SIZE,
            Message::NoteCreate(req) => req.encoded_len(),
            Message::NoteUpdate(req) => req.encoded_len(),
            Message::NoteDelete(_) | Message::NoteGet(_) => NOTE_ID_SIZE,
            Message::Logout | Message::NoteList => 0,
        }
    }

    pub fn encode_payload(&self, dst: &mut BytesMut) {
        match self {
            Message::Register(req) => req.encode(dst),
            Message::Login(req) => req.encode(dst),
            Message::NoteCreate(req) => req.encode(dst),
            Message::NoteUpdate(req) => req.encode(dst),
            Message::NoteDelete(id) | Message::NoteGet(id) => dst.put_u32_le(*id),
            Message::Logout | Message::NoteList => {}
        }
    }

    /// Decode a request payload for the given message type.
    pub fn decode(msg_type: u8, payload: &[u8]) -> Result<Self, DecodeError> {
        match msg_type {
            REGISTER => RegisterRequest::decode(payload).map(Message::Register),
            LOGIN => LoginRequest::decode(payload).map(Message::Login),
            LOGOUT => expect_len(msg_type, payload, 0).map(|_| Message::Logout),
            NOTE_CREATE => NoteCreateRequest::decode(payload).map(Message::NoteCreate),
            NOTE_UPDATE => NoteUpdateRequest::decode(payload).map(Message::NoteUpdate),
            NOTE_DELETE => decode_note_id(msg_type, payload).map(Message::NoteDelete),
            NOTE_LIST => expect_len(msg_type, payload, 0).map(|_| Message::NoteList),
            NOTE_GET => decode_note_id(msg_type, payload).map(Message::NoteGet),
            other => Err(DecodeError::UnknownMessageType(other)),
        }
    }
}

/// Encode a REGISTER payload into its 161-byte wire form.
pub fn encode_register_payload(
    username: &str,
    password: &str,
    public_key: &[u8],
) -> Result<[u8; REGISTER_PAYLOAD_SIZE], EncodeError> {
    RegisterRequest::new(username, password, public_key).map(|req| req.to_bytes())
}

/// Decode a 161-byte REGISTER payload.
pub fn decode_register_payload(src: &[u8]) -> Result<RegisterRequest, DecodeError> {
    RegisterRequest::decode(src)
}

fn expect_len(msg_type: u8, payload: &[u8], expected: usize) -> Result<(), DecodeError> {
    if payload.len() != expected {
        return Err(DecodeError::PayloadLength {
            msg_type,
            expected,
            got: payload.len(),
        });
    }
    Ok(())
}

fn decode_note_id(msg_type: u8, mut payload: &[u8]) -> Result<u32, DecodeError> {
    expect_len(msg_type, payload, NOTE_ID_SIZE)?;
    Ok(payload.get_u32_le())
}

fn check_content_len(content: &[u8]) -> Result<(), EncodeError> {
    if u32::try_from(content.len()).is_err() {
        return Err(EncodeError::FieldTooLong {
            field: "content",
            len: content.len(),
            max: u32::MAX as usize,
        });
    }
    Ok(())
}

// Length fits u32: checked when the request was built.
fn put_content(content: &Bytes, dst: &mut BytesMut) {
    dst.put_u32_le(content.len() as u32);
    dst.put_slice(content);
}

/// Read `content_len || content`, which must span the rest of the payload.
fn take_content(mut src: &[u8]) -> Result<Bytes, DecodeError> {
    let declared = src.get_u32_le() as usize;
    if declared != src.len() {
        return Err(DecodeError::ContentLength {
            declared,
            got: src.len(),
        });
    }
    Ok(Bytes::copy_from_slice(src))
}

fn pad_text<const N: usize>(field: &'static str, text: &str) -> Result<[u8; N], EncodeError> {
    let bytes = text.as_bytes();
    if bytes.len() > N {
        return Err(EncodeError::FieldTooLong {
            field,
            len: bytes.len(),
            max: N,
        });
    }
    let mut out = [0u8; N];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

fn unpad_text(field: &[u8]) -> Cow<'_, str> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end])
}

// Callers split `src` at the field widths, so lengths always match.
fn copy_field<const N: usize>(src: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(src);
    out
}
