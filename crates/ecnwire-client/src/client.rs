use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use bytes::Bytes;
use ecnwire_frame::{
    is_reply, kind_name, requires_session, ErrorCode, FrameError, FrameReader, FrameWriter, Header,
    LoginRequest, Message, NoteCreateRequest, NoteUpdateRequest, RegisterRequest, Response,
    SessionToken, PROTOCOL_VERSION, SESSION_TOKEN_SIZE,
};
use ecnwire_transport::WireStream;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Connect to a server and wrap the stream in a [`Client`].
pub fn connect(addr: &str, config: ClientConfig) -> Result<Client<WireStream, WireStream>> {
    let stream = ecnwire_transport::connect_timeout(addr, config.connect_timeout)?;
    stream.set_nodelay(true)?;
    let reader_stream = stream.try_clone()?;

    let frame_config = config.frame_config();
    let reader = FrameReader::with_config_wire(reader_stream, frame_config.clone())?;
    let writer = FrameWriter::with_config_wire(stream, frame_config)?;

    Ok(Client::from_parts(reader, writer, config))
}

/// The response half of one exchange.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub header: Header,
    pub response: Response,
}

impl Exchange {
    /// True for a structured response with error code 0.
    pub fn is_success(&self) -> bool {
        self.response.is_success()
    }

    /// The response error code, if the payload held an envelope.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.response.envelope().map(|envelope| envelope.error_code)
    }

    /// Result data (possibly clipped), empty when there is none.
    pub fn data(&self) -> Bytes {
        self.response
            .envelope()
            .map(|envelope| envelope.data.clone())
            .unwrap_or_default()
    }
}

/// Drives request/response exchanges over one connection, one at a time.
pub struct Client<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    session: SessionToken,
    config: ClientConfig,
    poisoned: bool,
}

impl<R: Read, W: Write> Client<R, W> {
    pub fn from_parts(
        reader: FrameReader<R>,
        writer: FrameWriter<W>,
        config: ClientConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            session: SessionToken::ZERO,
            config,
            poisoned: false,
        }
    }

    /// Send one request and read one response.
    ///
    /// Any failure after the first byte is written marks the client unusable;
    /// later calls return [`ClientError::Poisoned`].
    pub fn exchange(&mut self, message: &Message) -> Result<Exchange> {
        if self.poisoned {
            return Err(ClientError::Poisoned);
        }

        match self.exchange_inner(message) {
            Ok(exchange) => Ok(exchange),
            Err(err) => {
                if err.poisons_connection() {
                    warn!(error = %err, "exchange failed; connection unusable");
                    self.poisoned = true;
                }
                Err(err)
            }
        }
    }

    fn exchange_inner(&mut self, message: &Message) -> Result<Exchange> {
        if requires_session(message.msg_type()) && self.session.is_zero() {
            warn!(
                request = kind_name(message.msg_type()),
                "sending without a session token"
            );
        }
        let ClientConfig {
            read_timeout,
            write_timeout,
            ..
        } = self.config;
        self.writer
            .write_message(message, &self.session)
            .map_err(|err| stalled_as_timeout(err, write_timeout))?;
        let (header, response) = self
            .reader
            .read_response()
            .map_err(|err| stalled_as_timeout(err, read_timeout))?;

        if header.version != PROTOCOL_VERSION {
            warn!(
                version = header.version,
                expected = PROTOCOL_VERSION,
                "response uses a different protocol version"
            );
        }
        if !is_reply(header.msg_type) {
            warn!(
                msg_type = header.msg_type,
                "response carries a request message type"
            );
        }
        debug!(
            request = kind_name(message.msg_type()),
            reply = kind_name(header.msg_type),
            payload_len = header.payload_len,
            "exchange complete"
        );
        Ok(Exchange { header, response })
    }

    /// One REGISTER exchange. Field errors are reported before anything is sent.
    pub fn register(
        &mut self,
        username: &str,
        password: &str,
        public_key: &[u8],
    ) -> Result<Exchange> {
        let request = RegisterRequest::new(username, password, public_key)?;
        self.exchange(&Message::Register(request))
    }

    /// One LOGIN exchange. A successful reply carrying a 64-byte token becomes
    /// the session for later requests on this client.
    pub fn login(&mut self, username: &str, password: &str) -> Result<Exchange> {
        let request = LoginRequest::new(username, password)?;
        let exchange = self.exchange(&Message::Login(request))?;

        if exchange.is_success() {
            let data = exchange.data();
            if data.len() == SESSION_TOKEN_SIZE {
                self.session = SessionToken::from_slice(&data)?;
                debug!("session established");
            } else {
                warn!(len = data.len(), "login reply carried no usable session token");
            }
        }
        Ok(exchange)
    }

    /// One LOGOUT exchange for the current session. The session is cleared on success.
    pub fn logout(&mut self) -> Result<Exchange> {
        let exchange = self.exchange(&Message::Logout)?;
        if exchange.is_success() {
            self.session = SessionToken::ZERO;
        }
        Ok(exchange)
    }

    /// Create a note under the current session.
    pub fn note_create(&mut self, title: &str, content: &[u8]) -> Result<Exchange> {
        let request = NoteCreateRequest::new(title, Bytes::copy_from_slice(content))?;
        self.exchange(&Message::NoteCreate(request))
    }

    /// Replace the content of note `id`.
    pub fn note_update(&mut self, id: u32, content: &[u8]) -> Result<Exchange> {
        let request = NoteUpdateRequest::new(id, Bytes::copy_from_slice(content))?;
        self.exchange(&Message::NoteUpdate(request))
    }

    pub fn note_delete(&mut self, id: u32) -> Result<Exchange> {
        self.exchange(&Message::NoteDelete(id))
    }

    pub fn note_get(&mut self, id: u32) -> Result<Exchange> {
        self.exchange(&Message::NoteGet(id))
    }

    pub fn note_list(&mut self) -> Result<Exchange> {
        self.exchange(&Message::NoteList)
    }

    pub fn session(&self) -> &SessionToken {
        &self.session
    }

    pub fn set_session(&mut self, session: SessionToken) {
        self.session = session;
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Take the reader and writer back.
    pub fn into_parts(self) -> (FrameReader<R>, FrameWriter<W>) {
        (self.reader, self.writer)
    }
}

/// A blocking socket reports an expired timeout as `WouldBlock` (Unix) or
/// `TimedOut` (Windows).
fn stalled_as_timeout(err: FrameError, limit: Duration) -> ClientError {
    match err {
        FrameError::Io(io) if matches!(io.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
            ClientError::Timeout(limit)
        }
        other => ClientError::Frame(other),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::net::TcpListener;
    use std::thread;

    use bytes::BytesMut;
    use ecnwire_frame::{
        decode_header, encode_raw_frame, encode_response_payload, RawFrame, ERROR, LOGIN,
        LOGOUT, REGISTER, RESPONSE,
    };

    use super::*;

    fn reply(error_code: ErrorCode, data: &[u8]) -> Vec<u8> {
        let mut payload = BytesMut::new();
        encode_response_payload(error_code, data, &mut payload).unwrap();
        let msg_type = if error_code.is_success() { RESPONSE } else { ERROR };
        let mut wire = BytesMut::new();
        encode_raw_frame(1, msg_type, &SessionToken::ZERO, &payload, &mut wire).unwrap();
        wire.to_vec()
    }

    fn in_memory(replies: Vec<u8>) -> Client<Cursor<Vec<u8>>, Cursor<Vec<u8>>> {
        Client::from_parts(
            FrameReader::new(Cursor::new(replies)),
            FrameWriter::new(Cursor::new(Vec::new())),
            ClientConfig::default(),
        )
    }

    fn sent_frames(client: Client<Cursor<Vec<u8>>, Cursor<Vec<u8>>>) -> Vec<RawFrame> {
        let (_, writer) = client.into_parts();
        let wire = writer.into_inner().into_inner();
        let mut reader = FrameReader::new(Cursor::new(wire));
        let mut frames = Vec::new();
        while let Ok(frame) = reader.read_frame() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn register_success() {
        let mut client = in_memory(reply(ErrorCode::None, &[]));
        let exchange = client.register("Dennis", "123456", &[0x01; 65]).unwrap();

        assert!(exchange.is_success());
        assert_eq!(exchange.error_code(), Some(ErrorCode::None));
        assert!(exchange.data().is_empty());
        assert_eq!(exchange.header.msg_type, RESPONSE);

        let frames = sent_frames(client);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].header.msg_type, REGISTER);
        assert_eq!(frames[0].header.payload_len, 161);
        assert!(frames[0].header.session_token.is_zero());
    }

    #[test]
    fn register_rejected_is_not_an_error() {
        let mut client = in_memory(reply(ErrorCode::UserExists, &[]));
        let exchange = client.register("Dennis", "123456", &[0x01; 65]).unwrap();

        assert!(!exchange.is_success());
        assert_eq!(exchange.error_code(), Some(ErrorCode::UserExists));
        assert_eq!(exchange.header.msg_type, ERROR);
        assert!(!client.is_poisoned());
    }

    #[test]
    fn encode_error_sends_nothing_and_keeps_client_usable() {
        let mut client = in_memory(reply(ErrorCode::None, &[]));
        let err = client
            .register(&"x".repeat(40), "123456", &[0x01; 65])
            .unwrap_err();

        assert!(matches!(err, ClientError::Encode(_)));
        assert!(!client.is_poisoned());

        let exchange = client.register("Dennis", "123456", &[0x01; 65]).unwrap();
        assert!(exchange.is_success());
        assert_eq!(sent_frames(client).len(), 1);
    }

    #[test]
    fn short_read_poisons_client() {
        let mut truncated = reply(ErrorCode::None, &[]);
        truncated.truncate(40);
        let mut client = in_memory(truncated);

        let err = client.register("Dennis", "123456", &[0x01; 65]).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Frame(FrameError::ShortRead {
                expected: 68,
                got: 40
            })
        ));
        assert!(client.is_poisoned());

        let err = client.register("Dennis", "123456", &[0x01; 65]).unwrap_err();
        assert!(matches!(err, ClientError::Poisoned));
    }

    #[test]
    fn login_adopts_session_and_logout_clears_it() {
        let token = [0x7Cu8; 64];
        let mut replies = reply(ErrorCode::None, &token);
        replies.extend(reply(ErrorCode::None, &[]));
        let mut client = in_memory(replies);

        let exchange = client.login("Dennis", "123456").unwrap();
        assert!(exchange.is_success());
        assert_eq!(client.session().as_bytes(), &token);

        client.logout().unwrap();
        assert!(client.session().is_zero());

        let frames = sent_frames(client);
        assert_eq!(frames[0].header.msg_type, LOGIN);
        assert_eq!(frames[1].header.msg_type, LOGOUT);
        assert_eq!(frames[1].header.session_token.as_bytes(), &token);
        assert!(frames[1].payload.is_empty());
    }

    #[test]
    fn failed_login_keeps_previous_session() {
        let mut client = in_memory(reply(ErrorCode::AuthFailed, &[]));
        let previous = SessionToken::new([3u8; 64]);
        client.set_session(previous);

        let exchange = client.login("Dennis", "wrong").unwrap();
        assert_eq!(exchange.error_code(), Some(ErrorCode::AuthFailed));
        assert_eq!(client.session(), &previous);
    }

    #[test]
    fn login_with_odd_sized_token_is_ignored() {
        let mut client = in_memory(reply(ErrorCode::None, &[1u8; 10]));
        client.login("Dennis", "123456").unwrap();
        assert!(client.session().is_zero());
    }

    struct Stalled;

    impl Read for Stalled {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(ErrorKind::WouldBlock.into())
        }
    }

    impl Write for Stalled {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(ErrorKind::WouldBlock.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn split_timeouts() -> ClientConfig {
        ClientConfig {
            read_timeout: Duration::from_secs(1),
            write_timeout: Duration::from_secs(7),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn stalled_write_reports_write_timeout() {
        let mut client = Client::from_parts(
            FrameReader::new(Cursor::new(reply(ErrorCode::None, &[]))),
            FrameWriter::new(Stalled),
            split_timeouts(),
        );

        let err = client.register("Dennis", "123456", &[0x01; 65]).unwrap_err();
        assert!(matches!(err, ClientError::Timeout(d) if d == Duration::from_secs(7)));
        assert!(client.is_poisoned());
    }

    #[test]
    fn stalled_read_reports_read_timeout() {
        let mut client = Client::from_parts(
            FrameReader::new(Stalled),
            FrameWriter::new(Cursor::new(Vec::new())),
            split_timeouts(),
        );

        let err = client.register("Dennis", "123456", &[0x01; 65]).unwrap_err();
        assert!(matches!(err, ClientError::Timeout(d) if d == Duration::from_secs(1)));
        assert!(client.is_poisoned());
    }

    #[test]
    fn note_requests_carry_session() {
        let token = [0x42u8; 64];
        let mut replies = reply(ErrorCode::None, &token);
        replies.extend(reply(ErrorCode::None, &9u32.to_le_bytes()));
        replies.extend(reply(ErrorCode::None, b"hello"));
        replies.extend(reply(ErrorCode::NotFound, &[]));
        let mut client = in_memory(replies);

        client.login("Dennis", "123456").unwrap();
        let created = client.note_create("todo", b"hello").unwrap();
        assert_eq!(created.data().as_ref(), &9u32.to_le_bytes());
        let fetched = client.note_get(9).unwrap();
        assert_eq!(fetched.data().as_ref(), b"hello");
        let missing = client.note_delete(10).unwrap();
        assert_eq!(missing.error_code(), Some(ErrorCode::NotFound));

        let frames = sent_frames(client);
        assert_eq!(frames.len(), 4);
        for frame in &frames[1..] {
            assert_eq!(frame.header.session_token.as_bytes(), &token);
        }
        match Message::decode(frames[1].header.msg_type, &frames[1].payload).unwrap() {
            Message::NoteCreate(request) => {
                assert_eq!(request.title(), "todo");
                assert_eq!(request.content().as_ref(), b"hello");
            }
            other => panic!("unexpected request: {other:?}"),
        }
        assert_eq!(
            Message::decode(frames[2].header.msg_type, &frames[2].payload).unwrap(),
            Message::NoteGet(9)
        );
        assert_eq!(
            Message::decode(frames[3].header.msg_type, &frames[3].payload).unwrap(),
            Message::NoteDelete(10)
        );
    }

    #[test]
    fn note_title_too_long_sends_nothing() {
        let mut client = in_memory(Vec::new());
        let err = client.note_create(&"t".repeat(300), b"x").unwrap_err();
        assert!(matches!(err, ClientError::Encode(_)));
        assert!(!client.is_poisoned());
        assert!(sent_frames(client).is_empty());
    }

    #[test]
    fn exchange_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = FrameReader::new(stream.try_clone().unwrap());
            let mut writer = FrameWriter::new(stream);

            let frame = reader.read_frame().unwrap();
            let message = Message::decode(frame.header.msg_type, &frame.payload).unwrap();

            let mut payload = BytesMut::new();
            encode_response_payload(ErrorCode::None, b"id=42", &mut payload).unwrap();
            writer
                .send(RESPONSE, &SessionToken::ZERO, &payload)
                .unwrap();
            message
        });

        let config = ClientConfig::with_timeout(Duration::from_secs(2));
        let mut client = connect(&addr, config).unwrap();
        let exchange = client.register("Dennis", "123456", &[0x01; 65]).unwrap();

        assert!(exchange.is_success());
        assert_eq!(exchange.data().as_ref(), b"id=42");

        match server.join().unwrap() {
            Message::Register(request) => {
                assert_eq!(request.username(), "Dennis");
                assert_eq!(request.password(), "123456");
                assert_eq!(request.public_key(), &[0x01; 65]);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn silent_server_times_out_and_poisons() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(300));
            drop(stream);
        });

        let config = ClientConfig {
            read_timeout: Duration::from_millis(50),
            ..ClientConfig::default()
        };
        let mut client = connect(&addr, config).unwrap();
        let err = client.register("Dennis", "123456", &[0x01; 65]).unwrap_err();

        assert!(matches!(err, ClientError::Timeout(d) if d == Duration::from_millis(50)));
        assert!(client.is_poisoned());
        server.join().unwrap();
    }

    #[test]
    fn server_closing_early_is_short_read() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = vec![0u8; 68 + 161];
            stream.read_exact(&mut request).unwrap();
            let header = decode_header(&request).unwrap();
            assert_eq!(header.msg_type, REGISTER);
            stream.write_all(&[1, 100, 5, 0]).unwrap();
        });

        let mut client = connect(&addr, ClientConfig::default()).unwrap();
        let err = client.register("Dennis", "123456", &[0x01; 65]).unwrap_err();

        assert!(matches!(
            err,
            ClientError::Frame(FrameError::ShortRead {
                expected: 68,
                got: 4
            })
        ));
        server.join().unwrap();
    }
}
