//! Transparent relay through an Ethernet or USB bus adapter.
//!
//! A [`DataLink`] forwards bytes between the host and the RS485 or CAN bus
//! without interpreting them. On a CAN bus the adapter wraps each bus
//! message in a record (`0xAA`, big-endian id, length, data, CRC) that
//! [`DataLink::write_can`] and [`DataLink::read_can`] build and check.

use std::net::{TcpStream, UdpSocket};
use std::time::Duration;

use actlink_frame::{
    checksum, crc16, pack, Address, Frame, FrameDecoder, FrameError, Rw, Variant, CAN_SYNC,
    CHECKSUM_SIZE, HOST_ID, NEGOTIATE_CMD, WILDCARD_ID,
};
use actlink_transport::{StreamDecoder, TransportConfig};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::config::ClientConfig;
use crate::connector::Endpoint;
use crate::error::Result;

/// Time the adapter needs to drop its old session after [`reset_net`].
pub const RESET_SETTLE: Duration = Duration::from_secs(3);
/// Time the adapter needs to switch to USB pass-through.
pub const USB_MODE_SETTLE: Duration = Duration::from_secs(1);
/// Largest payload of one CAN bus message.
pub const CAN_RECORD_MAX: usize = 8;

const USB_MODE_LINE: &[u8] = b"# INTO-USB-PM\n";
const CAN_RECORD_HEADER: usize = 4;

/// One CAN bus message relayed by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanRecord {
    pub id: u16,
    pub data: Bytes,
}

/// Raw pass-through connection to a bus adapter.
#[derive(Debug)]
pub struct DataLink {
    client: Client,
}

impl DataLink {
    /// Open `endpoint`, asking a network adapter to run its bus at `baud`.
    pub fn open(endpoint: &Endpoint, variant: Variant, baud: Option<u32>) -> Result<Self> {
        let config = ClientConfig {
            baud,
            ..ClientConfig::default()
        };
        Self::open_with_config(endpoint, variant, &config, &TransportConfig::default())
    }

    /// Open with explicit configuration.
    ///
    /// TCP and UDP adapters are negotiated first; serial adapters are used
    /// as-is.
    pub fn open_with_config(
        endpoint: &Endpoint,
        variant: Variant,
        config: &ClientConfig,
        transport_config: &TransportConfig,
    ) -> Result<Self> {
        // CAN records are framed like CAN-form frames; RS485 bytes pass untouched.
        let decoder: Option<Box<dyn StreamDecoder>> = match (variant, endpoint) {
            (Variant::Can, Endpoint::Udp(_)) | (Variant::Rs, _) => None,
            (Variant::Can, _) => Some(Box::new(FrameDecoder::can())),
        };
        let transport = endpoint.open(decoder, transport_config)?;
        let client = Client::new(transport, variant, config.clone());

        if matches!(endpoint, Endpoint::Tcp(_) | Endpoint::Udp(_)) {
            if let Err(err) = client.connect_device() {
                client.close();
                return Err(err);
            }
        }
        info!(%endpoint, %variant, "data link open");
        Ok(Self { client })
    }

    pub fn variant(&self) -> Variant {
        self.client.variant()
    }

    /// Send bytes to the bus unchanged.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        self.client.transport().write(data)?;
        Ok(())
    }

    /// Next chunk from the bus, or `None` on timeout. `None` waits forever.
    pub fn read(&self, timeout: Option<Duration>) -> Result<Option<Bytes>> {
        Ok(self.client.transport().read(timeout)?)
    }

    /// Send one CAN bus message.
    pub fn write_can(&self, id: u16, data: &[u8]) -> Result<()> {
        self.write(&encode_can_record(id, data)?)
    }

    /// Next valid CAN bus message; records with a bad checksum are skipped.
    pub fn read_can(&self, timeout: Option<Duration>) -> Result<Option<CanRecord>> {
        loop {
            let Some(buf) = self.read(timeout)? else {
                return Ok(None);
            };
            match decode_can_record(&buf) {
                Ok(record) => return Ok(Some(record)),
                Err(err) => warn!(error = %err, len = buf.len(), "dropping CAN record"),
            }
        }
    }

    /// Discard everything received so far.
    pub fn flush(&self) -> Result<()> {
        self.client.transport().flush(None, None)?;
        Ok(())
    }

    /// Switch a USB-attached adapter into pass-through mode.
    pub fn enter_usb_mode(&self, settle: Duration) -> Result<()> {
        self.write(USB_MODE_LINE)?;
        debug!(?settle, "requested USB pass-through mode");
        std::thread::sleep(settle);
        Ok(())
    }

    pub fn is_error(&self) -> bool {
        self.client.is_error()
    }

    pub fn close(&self) {
        self.client.close();
    }
}

/// Kick a network adapter out of a stale session.
///
/// Pushes the negotiation frame over a fresh TCP connection and then as a
/// UDP datagram, and waits `settle` for the adapter to restart. Delivery
/// failures are logged, not returned: an adapter with no session to drop
/// may refuse either socket.
pub fn reset_net(host: &str, tcp_port: u16, udp_port: u16, variant: Variant, settle: Duration) {
    let address = match variant {
        Variant::Rs => Address::Rs {
            from: HOST_ID,
            to: WILDCARD_ID,
        },
        Variant::Can => Address::Can { id: WILDCARD_ID },
    };
    let frame = Frame::new(address, Rw::Read, NEGOTIATE_CMD, vec![NEGOTIATE_CMD; 7]);
    let wire = match pack(&frame) {
        Ok(wire) => wire,
        Err(err) => {
            warn!(error = %err, "cannot build reset frame");
            return;
        }
    };

    info!(host, tcp_port, udp_port, "resetting network adapter");
    match TcpStream::connect((host, tcp_port)) {
        Ok(mut stream) => {
            if let Err(err) = std::io::Write::write_all(&mut stream, &wire) {
                warn!(error = %err, "reset over TCP failed");
            }
        }
        Err(err) => warn!(error = %err, "reset over TCP failed"),
    }
    std::thread::sleep(Duration::from_millis(100));

    let sent = UdpSocket::bind(("0.0.0.0", 0))
        .and_then(|socket| socket.send_to(&wire, (host, udp_port)));
    if let Err(err) = sent {
        warn!(error = %err, "reset over UDP failed");
    }
    std::thread::sleep(settle);
}

fn encode_can_record(id: u16, data: &[u8]) -> Result<Bytes> {
    if data.is_empty() || data.len() > CAN_RECORD_MAX {
        return Err(FrameError::PayloadTooLarge {
            size: data.len(),
            max: CAN_RECORD_MAX,
        }
        .into());
    }
    let mut buf = BytesMut::with_capacity(CAN_RECORD_HEADER + data.len() + CHECKSUM_SIZE);
    buf.put_u8(CAN_SYNC);
    buf.put_u16(id);
    buf.put_u8(data.len() as u8);
    buf.put_slice(data);
    let crc = checksum(&buf);
    buf.put_slice(&crc);
    Ok(buf.freeze())
}

fn decode_can_record(buf: &[u8]) -> std::result::Result<CanRecord, FrameError> {
    if buf.len() < CAN_RECORD_HEADER + CHECKSUM_SIZE {
        return Err(FrameError::Len {
            expected: CAN_RECORD_HEADER + CHECKSUM_SIZE,
            actual: buf.len(),
        });
    }
    let body = buf.len() - CHECKSUM_SIZE;
    let expected = crc16(&buf[..body]);
    let got = u16::from_le_bytes([buf[body], buf[body + 1]]);
    if expected != got {
        return Err(FrameError::Crc { expected, got });
    }
    if buf[0] != CAN_SYNC {
        return Err(FrameError::Head(buf[0]));
    }
    let len = usize::from(buf[3]);
    if CAN_RECORD_HEADER + len != body {
        return Err(FrameError::Len {
            expected: CAN_RECORD_HEADER + len + CHECKSUM_SIZE,
            actual: buf.len(),
        });
    }
    Ok(CanRecord {
        id: u16::from_be_bytes([buf[1], buf[2]]),
        data: Bytes::copy_from_slice(&buf[CAN_RECORD_HEADER..body]),
    })
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use actlink_frame::unpack;

    use super::*;

    fn fast() -> (ClientConfig, TransportConfig) {
        let config = ClientConfig {
            negotiate_timeout: Duration::from_millis(200),
            baud: Some(1_000_000),
            ..ClientConfig::default()
        };
        let transport = TransportConfig {
            poll_interval: Duration::from_millis(10),
            ..TransportConfig::default()
        };
        (config, transport)
    }

    #[test]
    fn test_can_record_layout() {
        let wire = encode_can_record(0x0123, &[1, 2, 3]).unwrap();
        assert_eq!(&wire[..7], &[0xAA, 0x01, 0x23, 0x03, 1, 2, 3]);
        assert_eq!(wire.len(), 9);
        let record = decode_can_record(&wire).unwrap();
        assert_eq!(record.id, 0x0123);
        assert_eq!(record.data.as_ref(), &[1, 2, 3]);
    }

    #[test]
    fn test_can_record_limits() {
        assert!(encode_can_record(1, &[]).is_err());
        assert!(encode_can_record(1, &[0; 9]).is_err());

        let mut wire = encode_can_record(7, &[9; 8]).unwrap().to_vec();
        wire[5] ^= 0x01;
        assert!(matches!(decode_can_record(&wire), Err(FrameError::Crc { .. })));
    }

    #[test]
    fn test_tcp_relay_negotiates_then_passes_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let adapter = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 12];
            stream.read_exact(&mut buf).unwrap();
            let request = unpack(&buf, Variant::Rs).unwrap();
            let ack = Frame::new(
                Address::Rs {
                    from: 1,
                    to: HOST_ID,
                },
                Rw::Read,
                NEGOTIATE_CMD,
                vec![0],
            );
            stream.write_all(&pack(&ack).unwrap()).unwrap();

            let mut raw = [0u8; 4];
            stream.read_exact(&mut raw).unwrap();
            stream.write_all(&raw).unwrap();
            (request, stream)
        });

        let (config, transport) = fast();
        let link =
            DataLink::open_with_config(&Endpoint::Tcp(addr), Variant::Rs, &config, &transport)
                .unwrap();
        link.write(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();

        let mut echoed = Vec::new();
        while echoed.len() < 4 {
            let chunk = link.read(Some(Duration::from_secs(2))).unwrap().unwrap();
            echoed.extend_from_slice(&chunk);
        }
        assert_eq!(echoed, [0xDE, 0xAD, 0xBE, 0xEF]);

        let (request, _stream) = adapter.join().unwrap();
        assert_eq!(&request.data[..4], &1_000_000u32.to_be_bytes());
        link.close();
        assert!(link.is_error());
    }

    #[test]
    fn test_udp_can_records() {
        let adapter = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = adapter.local_addr().unwrap().to_string();
        let server = thread::spawn(move || {
            let mut buf = [0u8; 64];
            let (_, peer) = adapter.recv_from(&mut buf).unwrap();
            let ack = Frame::new(Address::Can { id: 1 }, Rw::Read, NEGOTIATE_CMD, vec![0]);
            adapter.send_to(&pack(&ack).unwrap(), peer).unwrap();

            let (n, peer) = adapter.recv_from(&mut buf).unwrap();
            let record = decode_can_record(&buf[..n]).unwrap();
            let mut bad = encode_can_record(0x10, &[0]).unwrap().to_vec();
            bad[4] ^= 0xFF;
            adapter.send_to(&bad, peer).unwrap();
            adapter
                .send_to(&encode_can_record(0x10, &[0x55]).unwrap(), peer)
                .unwrap();
            record
        });

        let (config, transport) = fast();
        let link =
            DataLink::open_with_config(&Endpoint::Udp(addr), Variant::Can, &config, &transport)
                .unwrap();
        link.write_can(0x0201, &[1, 2]).unwrap();
        let reply = link.read_can(Some(Duration::from_secs(2))).unwrap().unwrap();
        assert_eq!(reply, CanRecord { id: 0x10, data: Bytes::from_static(&[0x55]) });

        let sent = server.join().unwrap();
        assert_eq!(sent.id, 0x0201);
        assert_eq!(sent.data.as_ref(), &[1, 2]);
    }

    #[test]
    fn test_reset_net_reaches_both_sockets() {
        let tcp = TcpListener::bind("127.0.0.1:0").unwrap();
        let udp = UdpSocket::bind("127.0.0.1:0").unwrap();
        let tcp_port = tcp.local_addr().unwrap().port();
        let udp_port = udp.local_addr().unwrap().port();

        let tcp_side = thread::spawn(move || {
            let (mut stream, _) = tcp.accept().unwrap();
            let mut buf = [0u8; 12];
            stream.read_exact(&mut buf).unwrap();
            buf
        });

        reset_net("127.0.0.1", tcp_port, udp_port, Variant::Rs, Duration::ZERO);

        let mut datagram = [0u8; 64];
        udp.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let (n, _) = udp.recv_from(&mut datagram).unwrap();
        let over_tcp = tcp_side.join().unwrap();
        assert_eq!(&datagram[..n], &over_tcp);

        let frame = unpack(&over_tcp, Variant::Rs).unwrap();
        assert_eq!(frame.data.as_ref(), &[0x7F; 7]);
        assert_eq!(frame.address, Address::Rs { from: HOST_ID, to: WILDCARD_ID });
    }
}
