//! Message type IDs carried in the header's `msg_type` byte.
//!
//! Requests use the low range. The server answers every request with either
//! [`RESPONSE`] or [`ERROR`], so a reply's type does not echo the request's.

/// Account registration request.
pub const REGISTER: u8 = 1;

/// Login request; a successful reply carries a session token.
pub const LOGIN: u8 = 2;

/// Logout request, authenticated by the header's session token.
pub const LOGOUT: u8 = 3;

/// Create an encrypted note.
pub const NOTE_CREATE: u8 = 10;

/// Update an encrypted note.
pub const NOTE_UPDATE: u8 = 11;

/// Delete a note.
pub const NOTE_DELETE: u8 = 12;

/// List the caller's notes.
pub const NOTE_LIST: u8 = 13;

/// Fetch one note.
pub const NOTE_GET: u8 = 14;

/// Server reply, request succeeded.
pub const RESPONSE: u8 = 100;

/// Server reply, request failed.
pub const ERROR: u8 = 101;

/// Returns a human-readable name for a message type.
pub fn kind_name(msg_type: u8) -> &'static str {
    match msg_type {
        REGISTER => "REGISTER",
        LOGIN => "LOGIN",
        LOGOUT => "LOGOUT",
        NOTE_CREATE => "NOTE_CREATE",
        NOTE_UPDATE => "NOTE_UPDATE",
        NOTE_DELETE => "NOTE_DELETE",
        NOTE_LIST => "NOTE_LIST",
        NOTE_GET => "NOTE_GET",
        RESPONSE => "RESPONSE",
        ERROR => "ERROR",
        _ => "UNKNOWN",
    }
}

/// Returns true if the type is one a server sends back.
pub fn is_reply(msg_type: u8) -> bool {
    matches!(msg_type, RESPONSE | ERROR)
}

/// Returns true if requests of this type must carry a session token.
pub fn requires_session(msg_type: u8) -> bool {
    !matches!(msg_type, REGISTER | LOGIN)
}
