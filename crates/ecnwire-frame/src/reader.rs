use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use ecnwire_transport::WireStream;
use tracing::debug;

use crate::codec::{decode_header, FrameConfig, Header, RawFrame, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::response::{decode_response_payload, Response};

/// Read exactly `n` bytes from `stream`.
///
/// A single `read` may return fewer bytes than asked for, so this loops until
/// `n` bytes have accumulated. A zero-length read before that means the peer
/// closed early and fails with [`FrameError::ShortRead`]. Interrupted reads are
/// retried; every other I/O error is returned as-is.
pub fn read_exact<R: Read + ?Sized>(stream: &mut R, n: usize) -> Result<Bytes> {
    let mut buf = BytesMut::zeroed(n);
    let mut filled = 0usize;

    while filled < n {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(FrameError::ShortRead {
                    expected: n,
                    got: filled,
                })
            }
            Ok(read) => filled += read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }

    Ok(buf.freeze())
}

/// Reads complete frames from any `Read` stream.
///
/// Pulls the fixed 68-byte header, then exactly `payload_len` more bytes.
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ShortRead)` if the stream ends at either stage.
    pub fn read_frame(&mut self) -> Result<RawFrame> {
        let header = self.read_header()?;
        let payload = match header.payload_size() {
            0 => Bytes::new(),
            len => read_exact(&mut self.inner, len)?,
        };

        debug!(
            version = header.version,
            msg_type = header.msg_type,
            payload_len = header.payload_len,
            "frame received"
        );
        Ok(RawFrame { header, payload })
    }

    /// Read the next frame and decode its payload as a response.
    pub fn read_response(&mut self) -> Result<(Header, Response)> {
        let frame = self.read_frame()?;
        let response = decode_response_payload(frame.payload, frame.header.payload_size())?;
        Ok((frame.header, response))
    }

    fn read_header(&mut self) -> Result<Header> {
        let bytes = read_exact(&mut self.inner, HEADER_SIZE)?;
        Ok(decode_header(&bytes)?)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<WireStream> {
    /// Create a frame reader for `WireStream` and apply read timeout from config.
    pub fn with_config_wire(inner: WireStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: ecnwire_transport::TransportError) -> FrameError {
    match err {
        ecnwire_transport::TransportError::Io(io) => FrameError::Io(io),
        ecnwire_transport::TransportError::Resolve { source, .. }
        | ecnwire_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
