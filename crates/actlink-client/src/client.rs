use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use actlink_frame::{unpack_reply, Address, Frame, FrameError, Rw, Variant, WILDCARD_ID};
use actlink_transport::Transport;
use bytes::{Bytes, BytesMut};
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::register::{Descriptor, FieldLen};
use crate::status::Status;

/// Device id a fresh client talks to.
pub const DEFAULT_DEVICE_ID: u8 = 1;

/// A reply that passed correlation against its request.
///
/// A NACK (device-reported failure) is still a `Reply`: check
/// [`status`](Reply::status) before trusting the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    frame: Frame,
}

impl Reply {
    pub fn status(&self) -> Status {
        if self.frame.state {
            Status::State
        } else {
            Status::Ok
        }
    }

    pub fn is_nack(&self) -> bool {
        self.frame.state
    }

    /// Response payload. CAN-form fragments arrive already joined.
    pub fn data(&self) -> &Bytes {
        &self.frame.data
    }

    /// Id of the device that answered.
    pub fn responder(&self) -> u8 {
        self.frame.responder()
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn into_data(self) -> Bytes {
        self.frame.data
    }

    /// Turn a NACK into [`ClientError::Rejected`].
    pub fn into_ok(self) -> Result<Self> {
        if self.frame.state {
            Err(ClientError::Rejected {
                cmd: self.frame.cmd,
            })
        } else {
            Ok(self)
        }
    }
}

/// One responder's share of a broadcast read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub id: u8,
    pub status: Status,
    pub data: Bytes,
}

/// What an incoming frame must match to count as the reply.
#[derive(Debug, Clone, Copy)]
struct Pending {
    address: Address,
    rw: Rw,
    cmd: u8,
    /// Payload size; `None` accepts any single frame.
    expected: Option<usize>,
}

/// Reusable addressing for outgoing requests.
#[derive(Debug)]
struct Template {
    target: u8,
    aux: u8,
}

/// Request/response client for one bus connection.
///
/// Requests and replies are strictly paired: [`transact`](Client::transact),
/// [`get_range`](Client::get_range) and [`connect_device`](Client::connect_device)
/// hold the connection lock across send and pend, and [`lock`](Client::lock)
/// hands that lock to the caller for manual pairs.
pub struct Client {
    transport: Transport,
    variant: Variant,
    config: ClientConfig,
    template: Mutex<Template>,
}

impl Client {
    /// Wrap an open transport. No negotiation is performed.
    pub fn new(transport: Transport, variant: Variant, config: ClientConfig) -> Self {
        debug!(kind = transport.kind(), %variant, "client created");
        Self {
            transport,
            variant,
            config,
            template: Mutex::new(Template {
                target: DEFAULT_DEVICE_ID,
                aux: 0,
            }),
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Current target device id.
    ///
    /// Blocks while another thread holds a [`Session`].
    pub fn target(&self) -> u8 {
        self.lock_template().target
    }

    /// Auxiliary id set by the last [`connect_to`](Client::connect_to).
    pub fn aux(&self) -> u8 {
        self.lock_template().aux
    }

    /// Point later requests at another device without reopening the link.
    pub fn connect_to(&self, target: u8, aux: u8) {
        self.lock().connect_to(target, aux);
    }

    /// Take the connection lock for a manual send/pend pair.
    pub fn lock(&self) -> Session<'_> {
        Session {
            client: self,
            template: self.lock_template(),
        }
    }

    /// Send a request to the current target.
    pub fn send(&self, rw: Rw, descriptor: &Descriptor, payload: &[u8]) -> Result<()> {
        self.lock().send(rw, descriptor, payload)
    }

    /// Wait for the reply to the last request; `None` uses the configured timeout.
    pub fn pend(
        &self,
        rw: Rw,
        descriptor: &Descriptor,
        timeout: Option<Duration>,
    ) -> Result<Reply> {
        self.lock().pend(rw, descriptor, timeout)
    }

    /// Like [`pend`](Client::pend) with a call-time response size.
    pub fn pend_sized(
        &self,
        rw: Rw,
        descriptor: &Descriptor,
        len: usize,
        timeout: Option<Duration>,
    ) -> Result<Reply> {
        self.lock().pend_sized(rw, descriptor, len, timeout)
    }

    /// Send a request and wait for its reply under one lock.
    pub fn transact(
        &self,
        rw: Rw,
        descriptor: &Descriptor,
        payload: &[u8],
        timeout: Option<Duration>,
    ) -> Result<Reply> {
        let mut session = self.lock();
        session.send(rw, descriptor, payload)?;
        session.pend(rw, descriptor, timeout)
    }

    /// Negotiate the link with the bus adapter.
    ///
    /// Broadcasts the negotiation command carrying the configured baud rate
    /// and waits for a one-byte acknowledgement. The far end may not be
    /// byte-synchronized right after power-up, so the frame is re-sent up to
    /// `negotiate_attempts` times.
    pub fn connect_device(&self) -> Result<()> {
        let descriptor = Descriptor::NEGOTIATE;
        let mut payload = [descriptor.cmd; 7];
        let baud = self.config.baud.unwrap_or(u32::MAX);
        payload[..4].copy_from_slice(&baud.to_be_bytes());

        let address = self.address(WILDCARD_ID);
        let pending = Pending {
            address,
            rw: Rw::Read,
            cmd: descriptor.cmd,
            expected: expected_response(&descriptor, Rw::Read)?,
        };
        let attempts = self.config.negotiate_attempts.max(1);

        let _guard = self.lock_template();
        let mut last = ClientError::Timeout(self.config.negotiate_timeout);
        for attempt in 1..=attempts {
            self.transmit(address, Rw::Read, descriptor.cmd, &payload)?;
            match self
                .receive(&pending, self.config.negotiate_timeout)
                .and_then(Reply::into_ok)
            {
                Ok(_) => {
                    info!(
                        attempt,
                        baud = ?self.config.baud,
                        variant = %self.variant,
                        "link negotiated"
                    );
                    return Ok(());
                }
                Err(err) if err.is_dead() => return Err(err),
                Err(err) => {
                    warn!(attempt, error = %err, "link negotiation attempt failed");
                    last = err;
                }
            }
        }
        Err(ClientError::Connect {
            attempts,
            source: Box::new(last),
        })
    }

    /// Broadcast a read and collect one reply per device in `start..=end`.
    ///
    /// The request payload is `[start, end]`. One pend is made per device in
    /// the range and each reply lands in the slot of the id that sent it; a
    /// reply that fails correlation records its status there too. A device
    /// that never answers leaves its slot at [`Status::Timeout`]. Only a dead
    /// connection fails the whole call.
    pub fn get_range(&self, descriptor: &Descriptor, start: u8, end: u8) -> Result<Vec<Slot>> {
        let mut slots: Vec<Slot> = (start..=end)
            .map(|id| Slot {
                id,
                status: Status::Timeout,
                data: Bytes::new(),
            })
            .collect();
        if slots.is_empty() {
            return Ok(slots);
        }

        let payload = [start, end];
        check_request(descriptor, Rw::Read, &payload)?;
        let address = self.address(WILDCARD_ID);
        let pending = Pending {
            address,
            rw: Rw::Read,
            cmd: descriptor.cmd,
            expected: expected_response(descriptor, Rw::Read)?,
        };

        let _guard = self.lock_template();
        self.transmit(address, Rw::Read, descriptor.cmd, &payload)?;
        for _ in 0..slots.len() {
            match self.receive_tagged(&pending, self.config.timeout) {
                Ok(reply) => {
                    let id = reply.responder();
                    let status = reply.status();
                    fill_slot(&mut slots, id, status, reply.into_data());
                }
                Err((_, err)) if err.is_dead() => return Err(err),
                Err((Some(id), err)) => {
                    debug!(id, error = %err, "broadcast reply failed correlation");
                    fill_slot(&mut slots, id, err.status(), Bytes::new());
                }
                Err((None, ClientError::Timeout(_))) => trace!("broadcast pend timed out"),
                Err((None, err)) => debug!(error = %err, "discarding broadcast reply"),
            }
        }

        let answered = slots.iter().filter(|s| s.status != Status::Timeout).count();
        debug!(start, end, answered, "broadcast read finished");
        Ok(slots)
    }

    /// True once the connection is closed or its channel failed.
    pub fn is_error(&self) -> bool {
        self.transport.is_error()
    }

    /// Close the connection. Idempotent.
    pub fn close(&self) {
        self.transport.close();
    }

    fn lock_template(&self) -> MutexGuard<'_, Template> {
        self.template.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn address(&self, target: u8) -> Address {
        match self.variant {
            Variant::Rs => Address::Rs {
                from: self.config.host_id,
                to: target,
            },
            Variant::Can => Address::Can { id: target },
        }
    }

    fn transmit(&self, address: Address, rw: Rw, cmd: u8, payload: &[u8]) -> Result<()> {
        if self.transport.is_error() {
            return Err(ClientError::Dead);
        }
        let wire = Frame::new(address, rw, cmd, Bytes::copy_from_slice(payload)).pack()?;

        // Stale replies must not satisfy this request.
        match address {
            Address::Rs { from, to } => self.transport.flush(Some(to), Some(from))?,
            Address::Can { .. } => self.transport.flush(None, None)?,
        }
        trace!(?address, ?rw, cmd, len = payload.len(), "send");
        self.transport.write(&wire)?;
        Ok(())
    }

    fn receive(&self, pending: &Pending, timeout: Duration) -> Result<Reply> {
        self.receive_tagged(pending, timeout).map_err(|(_, err)| err)
    }

    /// Like `receive`, but a failure on a well-formed frame also names the
    /// device that sent it.
    fn receive_tagged(
        &self,
        pending: &Pending,
        timeout: Duration,
    ) -> std::result::Result<Reply, (Option<u8>, ClientError)> {
        if self.transport.is_error() {
            return Err((None, ClientError::Dead));
        }
        let deadline = Instant::now() + timeout;
        let mut head: Option<Frame> = None;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let read = self.transport.read(Some(remaining));
            let Some(buf) = read.map_err(|err| (None, ClientError::from(err)))? else {
                trace!(cmd = pending.cmd, ?timeout, "pend timed out");
                return Err((None, ClientError::Timeout(timeout)));
            };

            let frame = unpack_reply(&buf, pending.address)
                .map_err(|err| (None, ClientError::from(err)))?;
            let responder = Some(frame.responder());
            if frame.rw != pending.rw {
                let err = ClientError::Rw {
                    expected: pending.rw,
                    got: frame.rw,
                };
                return Err((responder, err));
            }
            if frame.cmd != pending.cmd {
                let err = ClientError::Cmd {
                    expected: pending.cmd,
                    got: frame.cmd,
                };
                return Err((responder, err));
            }

            let frame = match head.take() {
                None => frame,
                Some(first) => join_fragments(first, frame).map_err(|err| (None, err))?,
            };
            if frame.state {
                trace!(cmd = frame.cmd, responder = frame.responder(), "device NACK");
                return Ok(Reply { frame });
            }

            match pending.expected {
                Some(n) if self.variant == Variant::Can && frame.data.len() < n => {
                    trace!(have = frame.data.len(), want = n, "awaiting next fragment");
                    head = Some(frame);
                }
                Some(n) if frame.data.len() != n => {
                    let err = ClientError::Len {
                        expected: n,
                        got: frame.data.len(),
                    };
                    return Err((responder, err));
                }
                _ => return Ok(Reply { frame }),
            }
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.transport)
            .field("variant", &self.variant)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Exclusive hold on a connection for a send/pend pair.
///
/// Dropping the session releases the lock.
pub struct Session<'a> {
    client: &'a Client,
    template: MutexGuard<'a, Template>,
}

impl Session<'_> {
    pub fn target(&self) -> u8 {
        self.template.target
    }

    pub fn connect_to(&mut self, target: u8, aux: u8) {
        debug!(from = self.template.target, to = target, aux, "retargeting client");
        self.template.target = target;
        self.template.aux = aux;
    }

    /// Build and transmit a request to the current target.
    pub fn send(&mut self, rw: Rw, descriptor: &Descriptor, payload: &[u8]) -> Result<()> {
        check_request(descriptor, rw, payload)?;
        let address = self.client.address(self.template.target);
        self.client.transmit(address, rw, descriptor.cmd, payload)
    }

    /// Wait for and correlate the reply to the last request.
    pub fn pend(
        &mut self,
        rw: Rw,
        descriptor: &Descriptor,
        timeout: Option<Duration>,
    ) -> Result<Reply> {
        let expected = expected_response(descriptor, rw)?;
        self.pend_with(rw, descriptor.cmd, expected, timeout)
    }

    /// Like [`pend`](Session::pend) with a call-time response size.
    pub fn pend_sized(
        &mut self,
        rw: Rw,
        descriptor: &Descriptor,
        len: usize,
        timeout: Option<Duration>,
    ) -> Result<Reply> {
        expected_response(descriptor, rw)?;
        self.pend_with(rw, descriptor.cmd, Some(len), timeout)
    }

    fn pend_with(
        &mut self,
        rw: Rw,
        cmd: u8,
        expected: Option<usize>,
        timeout: Option<Duration>,
    ) -> Result<Reply> {
        let pending = Pending {
            address: self.client.address(self.template.target),
            rw,
            cmd,
            expected,
        };
        let timeout = timeout.unwrap_or(self.client.config.timeout);
        self.client.receive(&pending, timeout)
    }
}

fn check_request(descriptor: &Descriptor, rw: Rw, payload: &[u8]) -> Result<()> {
    match descriptor.request_len(rw) {
        None => Err(ClientError::Unsupported {
            cmd: descriptor.cmd,
            rw,
        }),
        Some(FieldLen::Fixed(n)) if n != payload.len() => Err(ClientError::PayloadLength {
            expected: n,
            got: payload.len(),
        }),
        Some(_) => Ok(()),
    }
}

fn expected_response(descriptor: &Descriptor, rw: Rw) -> Result<Option<usize>> {
    match descriptor.response_len(rw) {
        None => Err(ClientError::Unsupported {
            cmd: descriptor.cmd,
            rw,
        }),
        Some(FieldLen::Fixed(n)) => Ok(Some(n)),
        Some(FieldLen::Variable) => Ok(None),
    }
}

/// Record a broadcast result in the slot of device `id`.
///
/// Ids outside the range and repeats are ignored.
fn fill_slot(slots: &mut [Slot], id: u8, status: Status, data: Bytes) {
    match slots
        .iter_mut()
        .find(|s| s.id == id && s.status == Status::Timeout)
    {
        Some(slot) => {
            slot.status = status;
            slot.data = data;
        }
        None => debug!(id, "ignoring broadcast reply outside range or repeated"),
    }
}

/// Append a CAN-form continuation fragment to the frame collected so far.
fn join_fragments(mut first: Frame, next: Frame) -> Result<Frame> {
    if next.responder() != first.responder() {
        return Err(FrameError::MasterId {
            expected: first.responder(),
            got: next.responder(),
        }
        .into());
    }
    let mut data = BytesMut::with_capacity(first.data.len() + next.data.len());
    data.extend_from_slice(&first.data);
    data.extend_from_slice(&next.data);
    first.data = data.freeze();
    first.state |= next.state;
    Ok(first)
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;

    use actlink_frame::{pack, unpack, FrameDecoder, HOST_ID};
    use actlink_transport::TransportConfig;

    use super::*;

    fn fast_transport() -> TransportConfig {
        TransportConfig {
            poll_interval: Duration::from_millis(10),
            ..TransportConfig::default()
        }
    }

    fn rs_client() -> (Client, UnixStream) {
        let (local, remote) = UnixStream::pair().unwrap();
        let decoder = FrameDecoder::rs(DEFAULT_DEVICE_ID, HOST_ID);
        let transport = Transport::unix(local, Some(Box::new(decoder)), &fast_transport()).unwrap();
        (Client::new(transport, Variant::Rs, ClientConfig::default()), remote)
    }

    fn can_client() -> (Client, UnixStream) {
        let (local, remote) = UnixStream::pair().unwrap();
        let transport =
            Transport::unix(local, Some(Box::new(FrameDecoder::can())), &fast_transport()).unwrap();
        (Client::new(transport, Variant::Can, ClientConfig::default()), remote)
    }

    fn read_request(remote: &mut UnixStream, variant: Variant, payload_len: usize) -> Frame {
        let mut buf = vec![0u8; variant.min_frame_size() + payload_len];
        remote.read_exact(&mut buf).unwrap();
        unpack(&buf, variant).unwrap()
    }

    const POS_TARGET: Descriptor = Descriptor::new(0x30).read(0, 4).write(4, 0);

    #[test]
    fn test_session_send_then_pend() {
        let (client, mut remote) = rs_client();
        let mut session = client.lock();
        session.send(Rw::Read, &POS_TARGET, &[]).unwrap();

        let request = read_request(&mut remote, Variant::Rs, 0);
        assert_eq!(request.address, Address::Rs { from: HOST_ID, to: 1 });

        let reply = Frame::new(
            Address::Rs {
                from: 1,
                to: HOST_ID,
            },
            Rw::Read,
            0x30,
            vec![0, 0, 0, 7],
        );
        remote.write_all(&pack(&reply).unwrap()).unwrap();

        let got = session.pend(Rw::Read, &POS_TARGET, None).unwrap();
        assert_eq!(got.data().as_ref(), &[0, 0, 0, 7]);
        assert_eq!(got.status(), Status::Ok);
    }

    #[test]
    fn test_unsupported_and_wrong_payload() {
        let (client, _remote) = rs_client();
        let read_only = Descriptor::new(0x01).read(0, 12);
        assert!(matches!(
            client.send(Rw::Write, &read_only, &[1]),
            Err(ClientError::Unsupported { cmd: 0x01, rw: Rw::Write })
        ));
        assert!(matches!(
            client.send(Rw::Write, &POS_TARGET, &[1, 2]),
            Err(ClientError::PayloadLength { expected: 4, got: 2 })
        ));
    }

    #[test]
    fn test_wrong_length_reply() {
        let (client, mut remote) = rs_client();
        let device = std::thread::spawn(move || {
            read_request(&mut remote, Variant::Rs, 0);
            let reply = Frame::new(
                Address::Rs {
                    from: 1,
                    to: HOST_ID,
                },
                Rw::Read,
                0x30,
                vec![1, 2],
            );
            remote.write_all(&pack(&reply).unwrap()).unwrap();
            remote
        });
        let err = client.transact(Rw::Read, &POS_TARGET, &[], None).unwrap_err();
        assert!(matches!(err, ClientError::Len { expected: 4, got: 2 }));
        drop(device.join().unwrap());
    }

    #[test]
    fn test_nack_skips_length_check() {
        let (client, mut remote) = rs_client();
        let device = std::thread::spawn(move || {
            read_request(&mut remote, Variant::Rs, 4);
            let reply = Frame::new(
                Address::Rs {
                    from: 1,
                    to: HOST_ID,
                },
                Rw::Write,
                0x30,
                vec![0x21],
            )
            .with_state(true);
            remote.write_all(&pack(&reply).unwrap()).unwrap();
            remote
        });
        let reply = client
            .transact(Rw::Write, &POS_TARGET, &50.0f32.to_be_bytes(), None)
            .unwrap();
        assert_eq!(reply.status(), Status::State);
        assert_eq!(reply.data().as_ref(), &[0x21]);
        assert!(matches!(reply.into_ok(), Err(ClientError::Rejected { cmd: 0x30 })));
        drop(device.join().unwrap());
    }

    #[test]
    fn test_can_fragments_are_joined() {
        let (client, mut remote) = can_client();
        let uuid = Descriptor::new(0x01).read(0, 12);
        let device = std::thread::spawn(move || {
            read_request(&mut remote, Variant::Can, 0);
            let first = Frame::new(
                Address::Can { id: 1 },
                Rw::Read,
                0x01,
                (0u8..7).collect::<Vec<_>>(),
            );
            let second = Frame::new(
                Address::Can { id: 1 },
                Rw::Read,
                0x01,
                (7u8..12).collect::<Vec<_>>(),
            );
            remote.write_all(&pack(&first).unwrap()).unwrap();
            remote.write_all(&pack(&second).unwrap()).unwrap();
            remote
        });
        let reply = client.transact(Rw::Read, &uuid, &[], None).unwrap();
        assert_eq!(reply.data().as_ref(), &(0u8..12).collect::<Vec<_>>()[..]);
        drop(device.join().unwrap());
    }

    #[test]
    fn test_connect_to_retargets() {
        let (client, mut remote) = rs_client();
        client.connect_to(5, 9);
        assert_eq!(client.target(), 5);
        assert_eq!(client.aux(), 9);

        client.send(Rw::Read, &POS_TARGET, &[]).unwrap();
        let request = read_request(&mut remote, Variant::Rs, 0);
        assert_eq!(request.address, Address::Rs { from: HOST_ID, to: 5 });
    }

    #[test]
    fn test_negotiation_payload_and_retry() {
        let (local, mut remote) = UnixStream::pair().unwrap();
        let transport = Transport::unix(
            local,
            Some(Box::new(FrameDecoder::rs(WILDCARD_ID, HOST_ID))),
            &fast_transport(),
        )
        .unwrap();
        let config = ClientConfig {
            negotiate_timeout: Duration::from_millis(100),
            baud: Some(921_600),
            ..ClientConfig::default()
        };
        let client = Client::new(transport, Variant::Rs, config);

        let device = std::thread::spawn(move || {
            // Ignore the first attempt, acknowledge the second.
            let first = read_request(&mut remote, Variant::Rs, 7);
            let second = read_request(&mut remote, Variant::Rs, 7);
            let ack = Frame::new(Address::Rs { from: 0x01, to: HOST_ID }, Rw::Read, 0x7F, vec![0]);
            remote.write_all(&pack(&ack).unwrap()).unwrap();
            (first, second, remote)
        });

        client.connect_device().unwrap();
        let (first, second, _remote) = device.join().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.address, Address::Rs { from: HOST_ID, to: WILDCARD_ID });
        assert_eq!(first.cmd, 0x7F);
        assert_eq!(first.rw, Rw::Read);
        assert_eq!(first.data.as_ref(), &[0x00, 0x0E, 0x10, 0x00, 0x7F, 0x7F, 0x7F]);
    }

    #[test]
    fn test_negotiation_gives_up() {
        let (local, _remote) = UnixStream::pair().unwrap();
        let transport =
            Transport::unix(local, Some(Box::new(FrameDecoder::can())), &fast_transport())
                .unwrap();
        let config = ClientConfig {
            negotiate_timeout: Duration::from_millis(30),
            ..ClientConfig::default()
        };
        let client = Client::new(transport, Variant::Can, config);
        let err = client.connect_device().unwrap_err();
        assert_eq!(err.status(), Status::Connect);
        assert!(matches!(err, ClientError::Connect { attempts: 2, .. }));
    }

    #[test]
    fn test_dead_connection_fails_fast() {
        let (client, remote) = rs_client();
        drop(remote);
        let deadline = Instant::now() + Duration::from_secs(2);
        while !client.is_error() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(client.is_error());
        assert!(matches!(client.send(Rw::Read, &POS_TARGET, &[]), Err(ClientError::Dead)));
        let err = client.pend(Rw::Read, &POS_TARGET, None).unwrap_err();
        assert_eq!(err.status(), Status::Dead);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (client, _remote) = rs_client();
        client.close();
        client.close();
        assert!(client.is_error());
        assert!(matches!(
            client.get_range(&Descriptor::new(0x20).read(2, 4), 1, 3),
            Err(ClientError::Dead)
        ));
    }

    #[test]
    fn test_empty_range() {
        let (client, _remote) = rs_client();
        assert!(client
            .get_range(&Descriptor::new(0x20).read(2, 4), 3, 1)
            .unwrap()
            .is_empty());
    }
}
