//! Async framing over tokio streams.
//!
//! The read discipline matches the blocking [`crate::reader`]: header first,
//! then exactly `payload_len` bytes. Suspension happens only inside the reads
//! and the write, so dropping the future there abandons the exchange and the
//! stream must be discarded.

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{
    decode_header, encode_frame, encode_raw_frame, Header, RawFrame, SessionToken, HEADER_SIZE,
};
use crate::error::{FrameError, Result};
use crate::message::Message;
use crate::response::{decode_response_payload, Response};

/// `tokio_util` codec for ECN frames.
///
/// Outgoing [`Message`]s are stamped with the codec's session token.
#[derive(Debug, Clone, Default)]
pub struct EcnCodec {
    session_token: SessionToken,
}

impl EcnCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session_token: SessionToken) -> Self {
        Self { session_token }
    }

    pub fn session(&self) -> &SessionToken {
        &self.session_token
    }

    pub fn set_session(&mut self, session_token: SessionToken) {
        self.session_token = session_token;
    }
}

impl Decoder for EcnCodec {
    type Item = RawFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RawFrame>> {
        if src.len() < HEADER_SIZE {
            src.reserve(HEADER_SIZE - src.len());
            return Ok(None);
        }

        let header = decode_header(&src[..HEADER_SIZE])?;
        let total = HEADER_SIZE + header.payload_size();
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(header.payload_size()).freeze();
        Ok(Some(RawFrame { header, payload }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<RawFrame>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let expected = if src.len() < HEADER_SIZE {
            HEADER_SIZE
        } else {
            HEADER_SIZE + decode_header(&src[..HEADER_SIZE])?.payload_size()
        };
        Err(FrameError::ShortRead {
            expected,
            got: src.len(),
        })
    }
}

impl Encoder<Message> for EcnCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        encode_frame(&item, &self.session_token, dst)?;
        Ok(())
    }
}

impl Encoder<RawFrame> for EcnCodec {
    type Error = FrameError;

    fn encode(&mut self, item: RawFrame, dst: &mut BytesMut) -> Result<()> {
        encode_raw_frame(
            item.header.version,
            item.header.msg_type,
            &item.header.session_token,
            item.payload.as_ref(),
            dst,
        )?;
        Ok(())
    }
}

/// Async counterpart of [`crate::read_exact`].
pub async fn read_exact_async<R>(reader: &mut R, n: usize) -> Result<Bytes>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = BytesMut::zeroed(n);
    let mut filled = 0usize;

    while filled < n {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => {
                return Err(FrameError::ShortRead {
                    expected: n,
                    got: filled,
                })
            }
            Ok(read) => filled += read,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }

    Ok(buf.freeze())
}

/// Read one complete frame.
pub async fn read_frame_async<R>(reader: &mut R) -> Result<RawFrame>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let head = read_exact_async(reader, HEADER_SIZE).await?;
    let header = decode_header(&head)?;
    let payload = match header.payload_size() {
        0 => Bytes::new(),
        len => read_exact_async(reader, len).await?,
    };
    Ok(RawFrame { header, payload })
}

/// Read one frame and decode its payload as a response.
pub async fn read_response_async<R>(reader: &mut R) -> Result<(Header, Response)>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let frame = read_frame_async(reader).await?;
    let response = decode_response_payload(frame.payload, frame.header.payload_size())?;
    Ok((frame.header, response))
}

/// Encode and write one request frame, then flush.
pub async fn write_message_async<W>(
    writer: &mut W,
    message: &Message,
    session_token: &SessionToken,
) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = BytesMut::new();
    encode_frame(message, session_token, &mut buf)?;
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::kind::{REGISTER, RESPONSE};
    use crate::message::RegisterRequest;
    use crate::response::{encode_response_payload, ErrorCode};

    fn register() -> Message {
        Message::Register(RegisterRequest::new("Dennis", "123456", &[0x01; 65]).unwrap())
    }

    fn success_frame(data: &[u8]) -> RawFrame {
        let mut payload = BytesMut::new();
        encode_response_payload(ErrorCode::None, data, &mut payload).unwrap();
        RawFrame::new(RESPONSE, SessionToken::ZERO, payload.freeze()).unwrap()
    }

    #[test]
    fn decoder_waits_for_complete_frame() {
        let mut wire = BytesMut::new();
        encode_frame(&register(), &SessionToken::ZERO, &mut wire).unwrap();
        let full = wire.clone();

        let mut codec = EcnCodec::new();
        let mut partial = BytesMut::from(&full[..HEADER_SIZE - 1]);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        let mut partial = BytesMut::from(&full[..HEADER_SIZE + 10]);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        let frame = codec.decode(&mut wire).unwrap().unwrap();
        assert_eq!(frame.header.msg_type, REGISTER);
        assert!(wire.is_empty());
    }

    #[test]
    fn decode_eof_reports_short_read() {
        let mut wire = BytesMut::new();
        encode_frame(&register(), &SessionToken::ZERO, &mut wire).unwrap();
        wire.truncate(HEADER_SIZE + 100);

        let err = EcnCodec::new().decode_eof(&mut wire).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortRead {
                expected: 229,
                got: 168
            }
        ));

        let mut header_only = BytesMut::from(&[1u8; 40][..]);
        let err = EcnCodec::new().decode_eof(&mut header_only).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortRead {
                expected: 68,
                got: 40
            }
        ));

        let mut empty = BytesMut::new();
        assert!(EcnCodec::new().decode_eof(&mut empty).unwrap().is_none());
    }

    #[test]
    fn encoder_uses_session_token() {
        let token = SessionToken::new([0x11; 64]);
        let mut codec = EcnCodec::with_session(token);
        let mut wire = BytesMut::new();
        codec.encode(Message::Logout, &mut wire).unwrap();

        assert_eq!(wire.len(), HEADER_SIZE);
        assert_eq!(decode_header(&wire).unwrap().session_token, token);
        assert_eq!(codec.session(), &token);
    }

    #[tokio::test]
    async fn framed_roundtrip_over_duplex() {
        let (client, server) = tokio::io::duplex(64);

        let server_task = tokio::spawn(async move {
            let (read_half, write_half) = tokio::io::split(server);
            let mut frames = FramedRead::new(read_half, EcnCodec::new());
            let mut sink = FramedWrite::new(write_half, EcnCodec::new());

            let request = frames.next().await.unwrap().unwrap();
            let message = Message::decode(request.header.msg_type, &request.payload).unwrap();
            sink.send(success_frame(b"welcome")).await.unwrap();
            message
        });

        let (mut read_half, mut write_half) = tokio::io::split(client);
        write_message_async(&mut write_half, &register(), &SessionToken::ZERO)
            .await
            .unwrap();
        let (header, response) = read_response_async(&mut read_half).await.unwrap();

        assert_eq!(header.msg_type, RESPONSE);
        assert_eq!(response.envelope().unwrap().data.as_ref(), b"welcome");
        assert_eq!(server_task.await.unwrap(), register());
    }

    #[tokio::test]
    async fn async_short_read_on_close() {
        let (mut client, mut server) = tokio::io::duplex(256);
        server.write_all(&[0u8; 40]).await.unwrap();
        drop(server);

        let err = read_frame_async(&mut client).await.unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortRead {
                expected: 68,
                got: 40
            }
        ));
    }
}
