//! Stream transport for the ECN notes wire protocol.
//!
//! The protocol runs over a single persistent, bidirectional byte stream. This
//! crate wraps a connected TCP socket in [`WireStream`] so the framing layer
//! only ever sees `Read + Write`, plus the timeout knobs used to bound a
//! blocking exchange.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::WireStream;
pub use tcp::{connect, connect_timeout};

#[cfg(feature = "async")]
pub use tcp::connect_async;
