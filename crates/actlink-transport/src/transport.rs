use std::io::{ErrorKind, Read, Write};
use std::net::ToSocketAddrs;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::error::{Result, TransportError};
use crate::queue::FrameQueue;
use crate::traits::{LinkStream, StreamDecoder};

const OPEN: u8 = 0;
const CLOSED: u8 = 1;
const DEAD: u8 = 2;

/// Configuration for a [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Frames held before the oldest is dropped. Default: 10.
    pub queue_capacity: usize,
    /// Bytes requested per read from the channel. Default: 1024.
    pub read_chunk_size: usize,
    /// How often the reader rechecks for close while idle. Default: 100 ms.
    pub poll_interval: Duration,
    /// TCP connect timeout. Default: 3 s.
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            queue_capacity: FrameQueue::DEFAULT_CAPACITY,
            read_chunk_size: 1024,
            poll_interval: Duration::from_millis(100),
            connect_timeout: Duration::from_secs(3),
        }
    }
}

struct Shared {
    queue: FrameQueue,
    decoder: Option<Mutex<Box<dyn StreamDecoder>>>,
    state: AtomicU8,
    kind: &'static str,
}

impl Shared {
    fn state(&self) -> u8 {
        self.state.load(Ordering::Acquire)
    }

    fn is_open(&self) -> bool {
        self.state() == OPEN
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state() {
            OPEN => Ok(()),
            DEAD => Err(TransportError::Dead),
            _ => Err(TransportError::Shutdown),
        }
    }

    /// Move OPEN to DEAD and release anyone waiting on the queue.
    fn fail(&self) {
        if self
            .state
            .compare_exchange(OPEN, DEAD, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.queue.close();
        }
    }

    fn decoder(&self) -> Option<MutexGuard<'_, Box<dyn StreamDecoder>>> {
        self.decoder
            .as_ref()
            .map(|d| d.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn enqueue(&self, frame: Bytes) {
        trace!(kind = self.kind, len = frame.len(), "frame queued");
        if let Some(old) = self.queue.push(frame) {
            warn!(kind = self.kind, dropped = old.len(), "frame queue full; dropped oldest");
        }
    }

    fn deliver(&self, chunk: &[u8]) {
        match self.decoder() {
            Some(mut decoder) => decoder.feed(chunk, &mut |frame| self.enqueue(frame)),
            None => self.enqueue(Bytes::copy_from_slice(chunk)),
        }
    }
}

/// A physical channel with a background reader.
///
/// The reader thread pulls bytes off the channel, runs them through the
/// optional [`StreamDecoder`], and queues each completed frame. Without a
/// decoder every read chunk (or datagram) is queued as-is.
///
/// All methods take `&self`; writes are serialized internally.
pub struct Transport {
    writer: Mutex<LinkStream>,
    shared: Arc<Shared>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Transport {
    /// Start a transport over an already connected stream.
    pub fn spawn(
        stream: LinkStream,
        decoder: Option<Box<dyn StreamDecoder>>,
        config: &TransportConfig,
    ) -> Result<Self> {
        let kind = stream.kind();
        let mut reader_stream = stream.try_clone()?;
        reader_stream.set_read_timeout(Some(config.poll_interval))?;

        let shared = Arc::new(Shared {
            queue: FrameQueue::new(config.queue_capacity),
            decoder: decoder.map(Mutex::new),
            state: AtomicU8::new(OPEN),
            kind,
        });

        let chunk_size = config.read_chunk_size.max(1);
        let handle = std::thread::Builder::new()
            .name(format!("actlink-{kind}-reader"))
            .spawn({
                let shared = Arc::clone(&shared);
                move || reader_loop(reader_stream, &shared, chunk_size)
            })?;

        debug!(kind, "transport started");
        Ok(Self {
            writer: Mutex::new(stream),
            shared,
            reader: Mutex::new(Some(handle)),
        })
    }

    /// Open a serial port at `baud`.
    #[cfg(unix)]
    pub fn serial(
        path: impl AsRef<Path>,
        baud: u32,
        decoder: Option<Box<dyn StreamDecoder>>,
        config: &TransportConfig,
    ) -> Result<Self> {
        Self::spawn(crate::device::open_serial(path, baud)?, decoder, config)
    }

    /// Open a character device without changing its line settings.
    #[cfg(unix)]
    pub fn char_device(
        path: impl AsRef<Path>,
        decoder: Option<Box<dyn StreamDecoder>>,
        config: &TransportConfig,
    ) -> Result<Self> {
        Self::spawn(crate::device::open_char_device(path)?, decoder, config)
    }

    /// Connect over TCP.
    pub fn tcp(
        addr: impl ToSocketAddrs + std::fmt::Debug,
        decoder: Option<Box<dyn StreamDecoder>>,
        config: &TransportConfig,
    ) -> Result<Self> {
        let stream = crate::net::connect_tcp(addr, config.connect_timeout)?;
        Self::spawn(stream, decoder, config)
    }

    /// Talk to one UDP peer.
    pub fn udp(
        addr: impl ToSocketAddrs + std::fmt::Debug,
        decoder: Option<Box<dyn StreamDecoder>>,
        config: &TransportConfig,
    ) -> Result<Self> {
        Self::spawn(crate::net::open_udp(addr)?, decoder, config)
    }

    /// Wrap one end of a connected Unix stream.
    #[cfg(unix)]
    pub fn unix(
        stream: std::os::unix::net::UnixStream,
        decoder: Option<Box<dyn StreamDecoder>>,
        config: &TransportConfig,
    ) -> Result<Self> {
        Self::spawn(LinkStream::from_unix(stream), decoder, config)
    }

    /// Write all of `data` to the channel.
    ///
    /// A write failure kills the transport.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        self.shared.ensure_open()?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        match writer.write_all(data).and_then(|()| writer.flush()) {
            Ok(()) => {
                trace!(kind = self.shared.kind, len = data.len(), "wrote");
                Ok(())
            }
            Err(err) => {
                warn!(kind = self.shared.kind, error = %err, "write failed");
                self.shared.fail();
                Err(err.into())
            }
        }
    }

    /// Wait up to `timeout` for the next queued frame.
    ///
    /// `Ok(None)` means the wait timed out; `None` as timeout waits until a
    /// frame arrives or the transport dies.
    pub fn read(&self, timeout: Option<Duration>) -> Result<Option<Bytes>> {
        self.shared.ensure_open()?;
        match self.shared.queue.pop(timeout) {
            Some(frame) => Ok(Some(frame)),
            None => {
                self.shared.ensure_open()?;
                Ok(None)
            }
        }
    }

    /// Discard queued frames and any partial frame in the decoder.
    ///
    /// `from` and `to`, when given, retarget the decoder's addressing filter.
    pub fn flush(&self, from: Option<u8>, to: Option<u8>) -> Result<()> {
        self.shared.ensure_open()?;
        // Hold the decoder across the clear so the reader cannot queue a
        // frame it finished before the reset.
        let decoder = self.shared.decoder();
        let dropped = self.shared.queue.clear();
        if let Some(mut decoder) = decoder {
            decoder.reset(from, to);
        }
        if dropped > 0 {
            debug!(kind = self.shared.kind, dropped, "flushed stale frames");
        }
        Ok(())
    }

    /// Stop the reader and release the channel. Idempotent.
    pub fn close(&self) {
        let prev = self.shared.state.swap(CLOSED, Ordering::AcqRel);
        if prev == CLOSED {
            return;
        }
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shutdown();
        self.shared.queue.close();

        let handle = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(kind = self.shared.kind, "reader thread panicked");
            }
        }
        debug!(kind = self.shared.kind, "transport closed");
    }

    /// True once the transport is closed or its reader has failed.
    pub fn is_error(&self) -> bool {
        !self.shared.is_open()
    }

    /// Channel name for diagnostics (`serial`, `tcp`, `udp`, ...).
    pub fn kind(&self) -> &'static str {
        self.shared.kind
    }

    /// Frames currently waiting to be read.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("kind", &self.shared.kind)
            .field("state", &self.shared.state())
            .field("pending", &self.shared.queue.len())
            .finish()
    }
}

fn reader_loop(mut stream: LinkStream, shared: &Shared, chunk_size: usize) {
    let mut chunk = vec![0u8; chunk_size];
    while shared.is_open() {
        match stream.read(&mut chunk) {
            Ok(0) if stream.is_datagram() => continue,
            Ok(0) => {
                if shared.is_open() {
                    warn!(kind = shared.kind, "channel closed by peer");
                    shared.fail();
                }
                break;
            }
            Ok(n) => shared.deliver(&chunk[..n]),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                ) => {}
            Err(err) => {
                if shared.is_open() {
                    warn!(kind = shared.kind, error = %err, "reader failed");
                    shared.fail();
                }
                break;
            }
        }
    }
    debug!(kind = shared.kind, "reader stopped");
}
