use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use ecnwire_transport::WireStream;
use tracing::debug;

use crate::codec::{
    encode_frame, encode_raw_frame, FrameConfig, RawFrame, SessionToken, HEADER_SIZE,
};
use crate::error::{FrameError, Result};
use crate::message::Message;
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 512;

/// Writes complete frames to any `Write` stream.
///
/// Each frame is encoded in full before the first byte goes out, so an
/// [`EncodeError`](crate::EncodeError) never leaves a partial frame behind.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and send a typed request (blocking).
    pub fn write_message(&mut self, message: &Message, session_token: &SessionToken) -> Result<()> {
        self.buf.clear();
        encode_frame(message, session_token, &mut self.buf)?;
        debug!(
            msg_type = message.msg_type(),
            payload_len = message.payload_len(),
            "sending frame"
        );
        self.write_buffered()
    }

    /// Write an already-built frame (blocking).
    ///
    /// The header's `payload_len` is recomputed from the payload.
    pub fn write_frame(&mut self, frame: &RawFrame) -> Result<()> {
        self.buf.clear();
        encode_raw_frame(
            frame.header.version,
            frame.header.msg_type,
            &frame.header.session_token,
            frame.payload.as_ref(),
            &mut self.buf,
        )?;
        debug!(
            msg_type = frame.header.msg_type,
            payload_len = frame.payload.len(),
            "sending frame"
        );
        self.write_buffered()
    }

    /// Encode and send an arbitrary payload under the current protocol version.
    pub fn send(
        &mut self,
        msg_type: u8,
        session_token: &SessionToken,
        payload: &[u8],
    ) -> Result<()> {
        let frame = RawFrame::new(msg_type, *session_token, payload.to_vec())?;
        self.write_frame(&frame)
    }

    fn write_buffered(&mut self) -> Result<()> {
        debug_assert!(self.buf.len() >= HEADER_SIZE);
        let total = self.buf.len();
        let mut sent = 0usize;
        while sent < total {
            match self.inner.write(&self.buf[sent..]) {
                Ok(0) => {
                    debug!(sent, total, "peer stopped accepting bytes mid-frame");
                    return Err(FrameError::ConnectionClosed);
                }
                Ok(n) => sent += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                // A write timeout on a blocking socket surfaces as WouldBlock;
                // it is reported, never retried.
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                other => return other.map_err(FrameError::Io),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<WireStream> {
    /// Create a frame writer for `WireStream` and apply write timeout from config.
    pub fn with_config_wire(inner: WireStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}
