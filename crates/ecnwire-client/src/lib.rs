//! Client side of one ECN request/response exchange.
//!
//! Connect, send a typed request, read exactly one response frame. There is
//! no retry: if an exchange fails part way, the client refuses further use
//! and the caller opens a new connection.

pub mod client;
pub mod config;
pub mod error;

pub use client::{connect, Client, Exchange};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
