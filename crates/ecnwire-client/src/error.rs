use std::time::Duration;

/// Errors that can occur in client exchanges.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] ecnwire_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] ecnwire_frame::FrameError),

    /// The request could not be encoded; nothing was sent.
    #[error("encode error: {0}")]
    Encode(#[from] ecnwire_frame::EncodeError),

    /// A read or write stalled past its configured timeout (the value shown).
    #[error("exchange timed out after {0:?}")]
    Timeout(Duration),

    /// A previous exchange failed mid-frame; the connection is out of sync.
    #[error("connection unusable after a failed exchange")]
    Poisoned,
}

impl ClientError {
    /// True if the error left the connection at an unknown frame boundary.
    pub fn poisons_connection(&self) -> bool {
        !matches!(
            self,
            ClientError::Encode(_) | ClientError::Frame(ecnwire_frame::FrameError::Encode(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
