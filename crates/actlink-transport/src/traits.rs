use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, UdpSocket};
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// Turns an arbitrarily chunked byte stream into discrete frames.
///
/// A decoder is owned by exactly one transport. The transport's reader thread
/// feeds it every chunk it reads; completed frames are handed to `sink` in the
/// order they finish.
pub trait StreamDecoder: Send {
    /// Consume `bytes`, emitting each completed frame through `sink`.
    fn feed(&mut self, bytes: &[u8], sink: &mut dyn FnMut(Bytes));

    /// Drop any partial frame and optionally repoint addressing expectations.
    fn reset(&mut self, from: Option<u8>, to: Option<u8>);
}

/// A connected physical channel. Implements Read + Write.
///
/// Wraps whichever OS object backs the link: a tty or character device file,
/// a TCP stream, a UDP socket bound to one peer, or a Unix stream.
pub struct LinkStream {
    inner: LinkStreamInner,
    /// Emulated read timeout for file-backed channels (sockets use the native one).
    file_timeout: Option<Duration>,
}

enum LinkStreamInner {
    #[cfg(unix)]
    File {
        file: std::fs::File,
        kind: &'static str,
    },
    Tcp(TcpStream),
    Udp {
        socket: UdpSocket,
        peer: SocketAddr,
    },
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkStreamInner::File { file, .. } => {
                wait_readable(file, self.file_timeout)?;
                file.read(buf)
            }
            LinkStreamInner::Tcp(stream) => stream.read(buf),
            LinkStreamInner::Udp { socket, peer } => loop {
                let (n, from) = socket.recv_from(buf)?;
                if from == *peer {
                    return Ok(n);
                }
                tracing::trace!(%from, expected = %peer, "dropping datagram from foreign peer");
            },
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkStreamInner::File { file, .. } => file.write(buf),
            LinkStreamInner::Tcp(stream) => stream.write(buf),
            LinkStreamInner::Udp { socket, peer } => socket.send_to(buf, *peer),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkStreamInner::File { file, .. } => file.flush(),
            LinkStreamInner::Tcp(stream) => stream.flush(),
            LinkStreamInner::Udp { .. } => Ok(()),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl LinkStream {
    #[cfg(unix)]
    pub(crate) fn from_file(file: std::fs::File, kind: &'static str) -> Self {
        Self::wrap(LinkStreamInner::File { file, kind })
    }

    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self::wrap(LinkStreamInner::Tcp(stream))
    }

    pub(crate) fn from_udp(socket: UdpSocket, peer: SocketAddr) -> Self {
        Self::wrap(LinkStreamInner::Udp { socket, peer })
    }

    /// Wrap one end of a connected Unix stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self::wrap(LinkStreamInner::Unix(stream))
    }

    fn wrap(inner: LinkStreamInner) -> Self {
        Self {
            inner,
            file_timeout: None,
        }
    }

    /// Set the read timeout; `None` blocks until data arrives.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::File { .. } => {
                self.file_timeout = timeout;
                Ok(())
            }
            LinkStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            LinkStreamInner::Udp { socket, .. } => {
                socket.set_read_timeout(timeout).map_err(Into::into)
            }
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let inner = match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::File { file, kind } => LinkStreamInner::File {
                file: file.try_clone()?,
                kind: *kind,
            },
            LinkStreamInner::Tcp(stream) => LinkStreamInner::Tcp(stream.try_clone()?),
            LinkStreamInner::Udp { socket, peer } => LinkStreamInner::Udp {
                socket: socket.try_clone()?,
                peer: *peer,
            },
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => LinkStreamInner::Unix(stream.try_clone()?),
        };
        Ok(Self {
            inner,
            file_timeout: self.file_timeout,
        })
    }

    /// Shut the channel down in both directions where the OS supports it.
    ///
    /// Wakes a thread blocked reading a TCP or Unix stream. Files and UDP
    /// sockets have no shutdown; their readers notice closure on the next poll.
    pub fn shutdown(&self) {
        let result = match &self.inner {
            LinkStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
            _ => Ok(()),
        };
        if let Err(err) = result {
            if err.kind() != ErrorKind::NotConnected {
                tracing::debug!(error = %err, kind = self.kind(), "shutdown failed");
            }
        }
    }

    /// True when each read yields one whole datagram.
    pub fn is_datagram(&self) -> bool {
        matches!(self.inner, LinkStreamInner::Udp { .. })
    }

    /// Channel name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            LinkStreamInner::File { kind, .. } => *kind,
            LinkStreamInner::Tcp(_) => "tcp",
            LinkStreamInner::Udp { .. } => "udp",
            #[cfg(unix)]
            LinkStreamInner::Unix(_) => "unix",
        }
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("LinkStream");
        dbg.field("type", &self.kind());
        if let LinkStreamInner::Udp { peer, .. } = &self.inner {
            dbg.field("peer", peer);
        }
        dbg.finish()
    }
}

/// Block until `file` is readable or `timeout` elapses.
#[cfg(unix)]
fn wait_readable(file: &std::fs::File, timeout: Option<Duration>) -> std::io::Result<()> {
    use std::os::fd::AsRawFd;

    let timeout_ms = match timeout {
        Some(t) => i32::try_from(t.as_millis()).unwrap_or(i32::MAX),
        None => -1,
    };
    let mut pfd = libc::pollfd {
        fd: file.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };

    // SAFETY: `pfd` is a valid, writable pollfd and we pass a count of exactly one.
    let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    match rc {
        0 => Err(std::io::Error::from(ErrorKind::TimedOut)),
        n if n < 0 => Err(std::io::Error::last_os_error()),
        _ => Ok(()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::net::UnixStream;

    use super::*;

    #[test]
    fn test_unix_roundtrip_and_kind() {
        let (left, right) = UnixStream::pair().unwrap();
        let mut a = LinkStream::from_unix(left);
        let mut b = LinkStream::from_unix(right);

        a.write_all(b"\xAA\x01").unwrap();
        let mut buf = [0u8; 2];
        b.read_exact(&mut buf).unwrap();

        assert_eq!(buf, [0xAA, 0x01]);
        assert_eq!(a.kind(), "unix");
        assert!(!a.is_datagram());
    }

    #[test]
    fn test_file_read_times_out() {
        let (left, _right) = UnixStream::pair().unwrap();
        let file = std::fs::File::from(std::os::fd::OwnedFd::from(left));
        let mut stream = LinkStream::from_file(file, "char-device");
        stream
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();

        let mut buf = [0u8; 4];
        let err = stream.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
    }

    #[test]
    fn test_udp_ignores_foreign_peer() {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        let stranger = UdpSocket::bind("127.0.0.1:0").unwrap();
        let local = UdpSocket::bind("127.0.0.1:0").unwrap();
        let local_addr = local.local_addr().unwrap();

        let mut stream = LinkStream::from_udp(local, device.local_addr().unwrap());
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        stranger.send_to(b"noise", local_addr).unwrap();
        device.send_to(b"frame", local_addr).unwrap();

        let mut buf = [0u8; 16];
        let n = stream.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"frame");
        assert!(stream.is_datagram());
    }

    #[test]
    fn test_clone_shares_channel() {
        let (left, right) = UnixStream::pair().unwrap();
        let a = LinkStream::from_unix(left);
        let mut a2 = a.try_clone().unwrap();
        let mut b = LinkStream::from_unix(right);

        a2.write_all(b"x").unwrap();
        let mut buf = [0u8; 1];
        b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"x");
        assert!(format!("{a:?}").contains("unix"));
    }
}
