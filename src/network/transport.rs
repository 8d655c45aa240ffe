//! Thin TCP layer shared by the server and client sessions.
//!
//! Every socket handed out here is non-blocking. Reads report "would block"
//! as a distinct outcome instead of an error, and writes retry until the
//! whole buffer is on the wire, so callers only ever see success or a hard
//! failure.

use crate::error::TransportError;
use crate::network::protocol::NetworkMessage;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_PORT: u16 = 4444;
pub const BUFFER_SIZE: usize = 4096;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// A blocked send gives up after this long without progress.
const WRITE_STALL_LIMIT: Duration = Duration::from_secs(5);
const WRITE_RETRY_DELAY: Duration = Duration::from_millis(1);

/// Result of a non-blocking read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Data(usize),
    /// Zero-byte read: the peer shut down its side.
    Closed,
    WouldBlock,
}

/// One connected peer.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: Option<SocketAddr>,
    write_lock: Mutex<()>,
}

impl Connection {
    pub fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true).ok();
        let peer = stream.peer_addr().ok();
        Ok(Self {
            stream,
            peer,
            write_lock: Mutex::new(()),
        })
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn read_nonblocking(&self, buf: &mut [u8]) -> Result<ReadOutcome, TransportError> {
        match (&self.stream).read(buf) {
            Ok(0) => Ok(ReadOutcome::Closed),
            Ok(n) => Ok(ReadOutcome::Data(n)),
            Err(e) if is_transient(&e) => Ok(ReadOutcome::WouldBlock),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes every byte or fails. Partial sends and "would block" are
    /// retried; whole calls are serialized so frames never interleave.
    pub fn write_all(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut sent = 0;
        let mut last_progress = Instant::now();
        while sent < bytes.len() {
            match (&self.stream).write(&bytes[sent..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => {
                    sent += n;
                    last_progress = Instant::now();
                }
                Err(e) if is_transient(&e) => {
                    if last_progress.elapsed() > WRITE_STALL_LIMIT {
                        return Err(io::Error::new(io::ErrorKind::TimedOut, "send stalled").into());
                    }
                    thread::sleep(WRITE_RETRY_DELAY);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub fn send(&self, msg: &NetworkMessage) -> Result<(), TransportError> {
        tracing::debug!(peer = ?self.peer, kind = msg.kind.as_str(), payload = %msg.payload, "send");
        self.write_all(msg.encode().as_bytes())
    }

    pub fn shutdown(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    /// Half-close: the peer reads EOF after everything already sent.
    pub fn shutdown_write(&self) {
        let _ = self.stream.shutdown(Shutdown::Write);
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Non-blocking listening socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    port: u16,
}

impl Listener {
    /// Binds all interfaces. Port 0 lets the OS choose; see [`Listener::port`].
    pub fn bind(port: u16) -> Result<Self, TransportError> {
        let inner = TcpListener::bind(("0.0.0.0", port))
            .map_err(|source| TransportError::Bind { port, source })?;
        inner.set_nonblocking(true)?;
        let port = inner.local_addr()?.port();
        Ok(Self { inner, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `Ok(None)` when nobody is waiting to connect.
    pub fn accept_nonblocking(&self) -> Result<Option<Connection>, TransportError> {
        match self.inner.accept() {
            Ok((stream, _)) => Connection::from_stream(stream).map(Some),
            Err(e) if is_transient(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Connects to `host:port`, giving up after `timeout`. Each resolved address
/// is tried in turn; the last failure is reported. A zero `timeout` means
/// [`DEFAULT_TIMEOUT_SECONDS`].
pub fn connect_with_timeout(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<Connection, TransportError> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|_| TransportError::Resolve {
            host: host.to_string(),
            port,
        })?
        .collect();

    let timeout = if timeout.is_zero() {
        Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)
    } else {
        timeout
    };

    let mut last_err = TransportError::Resolve {
        host: host.to_string(),
        port,
    };
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                tracing::info!(%addr, "connected");
                return Connection::from_stream(stream);
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock => {
                last_err = TransportError::Timeout {
                    addr: addr.to_string(),
                    secs: timeout.as_secs(),
                };
            }
            Err(source) => {
                last_err = TransportError::Connect {
                    addr: addr.to_string(),
                    source,
                };
            }
        }
    }
    Err(last_err)
}

/// Outward-facing IPv4 address of this host, or `127.0.0.1` if none.
///
/// Connecting a UDP socket only selects a route; no packet is sent.
pub fn local_ip_address() -> String {
    let probe = || -> io::Result<SocketAddr> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("8.8.8.8:80")?;
        socket.local_addr()
    };
    match probe() {
        Ok(addr) if !addr.ip().is_unspecified() => addr.ip().to_string(),
        _ => "127.0.0.1".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (Connection, Connection) {
        let listener = Listener::bind(0).unwrap();
        let client = connect_with_timeout("127.0.0.1", listener.port(), Duration::from_secs(2))
            .unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(server) = listener.accept_nonblocking().unwrap() {
                return (server, client);
            }
            assert!(Instant::now() < deadline, "accept timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn read_until(conn: &Connection, want: usize) -> Vec<u8> {
        let mut got = Vec::new();
        let mut buf = [0u8; BUFFER_SIZE];
        let deadline = Instant::now() + Duration::from_secs(2);
        while got.len() < want {
            match conn.read_nonblocking(&mut buf).unwrap() {
                ReadOutcome::Data(n) => got.extend_from_slice(&buf[..n]),
                ReadOutcome::WouldBlock => thread::sleep(Duration::from_millis(2)),
                ReadOutcome::Closed => break,
            }
            assert!(Instant::now() < deadline, "read timed out");
        }
        got
    }

    #[test]
    fn accept_without_pending_connection_returns_none() {
        let listener = Listener::bind(0).unwrap();
        assert_ne!(listener.port(), 0);
        assert!(listener.accept_nonblocking().unwrap().is_none());
    }

    #[test]
    fn empty_socket_would_block() {
        let (server, _client) = pair();
        let mut buf = [0u8; 16];
        assert_eq!(
            server.read_nonblocking(&mut buf).unwrap(),
            ReadOutcome::WouldBlock
        );
    }

    #[test]
    fn data_then_close() {
        let (server, client) = pair();
        client.send(&NetworkMessage::ping()).unwrap();
        assert_eq!(read_until(&server, 5), b"PING\n");

        client.shutdown();
        drop(client);
        let mut buf = [0u8; 16];
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            match server.read_nonblocking(&mut buf).unwrap() {
                ReadOutcome::Closed => break,
                ReadOutcome::WouldBlock => thread::sleep(Duration::from_millis(2)),
                ReadOutcome::Data(n) => panic!("unexpected {} bytes", n),
            }
            assert!(Instant::now() < deadline, "close not observed");
        }
    }

    #[test]
    fn large_write_arrives_whole() {
        let (server, client) = pair();
        let payload = vec![b'z'; 1 << 20];
        let reader = thread::spawn(move || read_until(&server, 1 << 20));
        client.write_all(&payload).unwrap();
        assert_eq!(reader.join().unwrap().len(), 1 << 20);
    }

    #[test]
    fn refused_connection_is_an_error() {
        // grab a free port, then close it so nothing is listening
        let port = Listener::bind(0).unwrap().port();
        let err = connect_with_timeout("127.0.0.1", port, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Connect { .. } | TransportError::Timeout { .. }
        ));
    }

    #[test]
    fn zero_timeout_still_connects() {
        let listener = Listener::bind(0).unwrap();
        let conn = connect_with_timeout("127.0.0.1", listener.port(), Duration::ZERO).unwrap();
        assert!(conn.peer_addr().is_some());
    }

    #[test]
    fn local_ip_is_an_address() {
        let ip = local_ip_address();
        assert!(ip.parse::<std::net::IpAddr>().is_ok(), "{}", ip);
    }
}
