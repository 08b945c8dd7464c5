//! Codec and diagnostic client for the ECN notes wire protocol.
//!
//! # Crate Structure
//!
//! - [`transport`] — TCP stream wrapper with timeout controls
//! - [`frame`] — Fixed-header frame codec and exact-length stream reads
//! - [`client`] — One request/response exchange per call over a connection

/// Re-export transport types.
pub mod transport {
    pub use ecnwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ecnwire_frame::*;
}

/// Re-export client types.
pub mod client {
    pub use ecnwire_client::*;
}
