use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::LinkStream;

/// Connect a TCP stream to the first resolvable address of `addr`.
pub fn connect_tcp(
    addr: impl ToSocketAddrs + std::fmt::Debug,
    timeout: Duration,
) -> Result<LinkStream> {
    let label = format!("{addr:?}");
    let candidates = resolve(&addr, &label)?;

    let mut last_err = None;
    for candidate in candidates {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                info!(peer = %candidate, "connected tcp");
                return Ok(LinkStream::from_tcp(stream));
            }
            Err(err) => {
                debug!(peer = %candidate, error = %err, "tcp connect attempt failed");
                last_err = Some(err);
            }
        }
    }

    Err(TransportError::Connect {
        addr: label,
        source: last_err.unwrap_or_else(|| std::io::ErrorKind::NotFound.into()),
    })
}

/// Bind an ephemeral UDP socket that talks to exactly one peer.
///
/// Datagrams arriving from any other source are discarded on read.
pub fn open_udp(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<LinkStream> {
    let label = format!("{addr:?}");
    let peer = resolve(&addr, &label)?
        .into_iter()
        .next()
        .ok_or_else(|| TransportError::Connect {
            addr: label.clone(),
            source: std::io::ErrorKind::NotFound.into(),
        })?;

    let local: SocketAddr = if peer.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        ([0u16; 8], 0).into()
    };
    let socket = UdpSocket::bind(local).map_err(|source| TransportError::Connect {
        addr: label,
        source,
    })?;

    info!(%peer, local = ?socket.local_addr().ok(), "opened udp");
    Ok(LinkStream::from_udp(socket, peer))
}

fn resolve(addr: &impl ToSocketAddrs, label: &str) -> Result<Vec<SocketAddr>> {
    addr.to_socket_addrs()
        .map(Iterator::collect)
        .map_err(|source| TransportError::Connect {
            addr: label.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn test_tcp_connects_and_carries_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 3];
            conn.read_exact(&mut buf).unwrap();
            buf
        });

        let mut stream = connect_tcp(addr, Duration::from_secs(1)).unwrap();
        stream.write_all(&[0xAA, 0x01, 0x02]).unwrap();
        assert_eq!(handle.join().unwrap(), [0xAA, 0x01, 0x02]);
        assert_eq!(stream.kind(), "tcp");
    }

    #[test]
    fn test_tcp_refused_is_connect_error() {
        // Bind then drop to get a port nobody listens on.
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let err = connect_tcp(addr, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    #[test]
    fn test_udp_sends_to_peer() {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut stream = open_udp(device.local_addr().unwrap()).unwrap();
        stream.write_all(b"ping").unwrap();

        let mut buf = [0u8; 8];
        let (n, _) = device.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ping");
    }
}
