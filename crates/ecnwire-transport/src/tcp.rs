use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::WireStream;

/// Connect to a listening server (blocking, OS connect timeout).
pub fn connect(addr: &str) -> Result<WireStream> {
    connect_with(addr, None)
}

/// Connect to a listening server, bounding each connect attempt by `timeout`.
///
/// Every resolved address is tried in order; the last connect error is
/// reported when none succeeds.
pub fn connect_timeout(addr: &str, timeout: Duration) -> Result<WireStream> {
    connect_with(addr, Some(timeout))
}

fn connect_with(addr: &str, timeout: Option<Duration>) -> Result<WireStream> {
    let candidates = resolve(addr)?;

    let mut last_err = None;
    for candidate in candidates {
        let attempt = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
            None => TcpStream::connect(candidate),
        };
        match attempt {
            Ok(stream) => {
                debug!(%candidate, "connected to server");
                return Ok(WireStream::from_tcp(stream));
            }
            Err(err) => {
                debug!(%candidate, error = %err, "connect attempt failed");
                last_err = Some(err);
            }
        }
    }

    match last_err {
        Some(source) => Err(TransportError::Connect {
            addr: addr.to_string(),
            source,
        }),
        None => Err(TransportError::NoAddress {
            addr: addr.to_string(),
        }),
    }
}

fn resolve(addr: &str) -> Result<Vec<SocketAddr>> {
    let resolved = addr
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            addr: addr.to_string(),
            source,
        })?
        .collect::<Vec<_>>();
    if resolved.is_empty() {
        return Err(TransportError::NoAddress {
            addr: addr.to_string(),
        });
    }
    Ok(resolved)
}

/// Connect to a listening server from async code.
#[cfg(feature = "async")]
pub async fn connect_async(addr: &str, timeout: Duration) -> Result<tokio::net::TcpStream> {
    let attempt = tokio::time::timeout(timeout, tokio::net::TcpStream::connect(addr)).await;
    match attempt {
        Ok(Ok(stream)) => {
            debug!(addr, "connected to server");
            Ok(stream)
        }
        Ok(Err(source)) => Err(TransportError::Connect {
            addr: addr.to_string(),
            source,
        }),
        Err(_) => Err(TransportError::Connect {
            addr: addr.to_string(),
            source: std::io::Error::from(std::io::ErrorKind::TimedOut),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn test_connect_and_exchange_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = std::thread::spawn(move || {
            let (mut server, _) = listener.accept().unwrap();
            let mut buf = [0u8; 5];
            server.read_exact(&mut buf).unwrap();
            server.write_all(&buf).unwrap();
        });

        let mut client = connect_timeout(&addr, Duration::from_secs(2)).unwrap();
        client.write_all(b"hello").unwrap();
        let mut echoed = [0u8; 5];
        client.read_exact(&mut echoed).unwrap();
        assert_eq!(&echoed, b"hello");

        handle.join().unwrap();
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };

        let result = connect_timeout(&addr, Duration::from_millis(500));
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn test_unresolvable_address() {
        let result = connect("not an address");
        assert!(matches!(result, Err(TransportError::Resolve { .. })));
    }

    #[test]
    fn test_timeouts_and_clone() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = std::thread::spawn(move || listener.accept().unwrap());

        let client = connect(&addr.to_string()).unwrap();
        client
            .set_read_timeout(Some(Duration::from_millis(10)))
            .unwrap();
        client
            .set_write_timeout(Some(Duration::from_millis(10)))
            .unwrap();
        client.set_nodelay(true).unwrap();
        assert_eq!(client.peer_addr().unwrap(), addr);

        let cloned = client.try_clone().unwrap();
        assert_eq!(cloned.peer_addr().unwrap(), addr);
        assert!(format!("{client:?}").contains("tcp"));

        let _server = handle.join().unwrap();
        client.shutdown().unwrap();
    }

    #[test]
    fn test_read_timeout_surfaces_as_io_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = std::thread::spawn(move || listener.accept().unwrap());

        let mut client = connect(&addr).unwrap();
        client
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();
        let _server = handle.join().unwrap();

        let mut buf = [0u8; 1];
        let err = client.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
        ));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_connect_async_reaches_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });
        let stream = connect_async(&addr.to_string(), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(stream.peer_addr().unwrap(), addr);
        accept.await.unwrap();
    }
}
