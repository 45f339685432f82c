use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum::{checksum, crc16};
use crate::error::{FrameError, Result};

/// Id the host uses as its own address on an RS-form bus.
pub const HOST_ID: u8 = 0xAA;

/// Broadcast / accept-any id.
pub const WILDCARD_ID: u8 = 0x55;

/// First byte of every CAN-form frame.
pub const CAN_SYNC: u8 = 0xAA;

/// Command reserved for link negotiation with a bus adapter.
pub const NEGOTIATE_CMD: u8 = 0x7F;

/// Trailing checksum bytes.
pub const CHECKSUM_SIZE: usize = 2;

/// Wire layout of a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// `from | to | state:1,len:7 | rw:1,cmd:7 | data | crc`
    Rs,
    /// `0xAA | 0x00 | state:1,id:7 | len | rw:1,cmd:7 | data | crc`
    Can,
}

impl Variant {
    /// Bytes before the payload, including the rw/cmd byte.
    pub const fn header_size(self) -> usize {
        match self {
            Self::Rs => 4,
            Self::Can => 5,
        }
    }

    /// Largest payload one frame carries.
    pub const fn max_data(self) -> usize {
        match self {
            Self::Rs => 125,
            Self::Can => 7,
        }
    }

    /// Largest legal value of the length field (`max_data + 1`).
    pub const fn max_len_field(self) -> u8 {
        self.max_data() as u8 + 1
    }

    /// Size of a frame with an empty payload.
    pub const fn min_frame_size(self) -> usize {
        self.header_size() + CHECKSUM_SIZE
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Rs => "rs",
            Self::Can => "can",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Rw {
    Read = 0,
    Write = 1,
}

impl Rw {
    fn from_bit(byte: u8) -> Self {
        if byte & 0x80 != 0 {
            Self::Write
        } else {
            Self::Read
        }
    }

    fn bit(self) -> u8 {
        (self as u8) << 7
    }
}

/// Frame addressing; the variant follows from the shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    Rs { from: u8, to: u8 },
    Can { id: u8 },
}

impl Address {
    pub const fn variant(self) -> Variant {
        match self {
            Self::Rs { .. } => Variant::Rs,
            Self::Can { .. } => Variant::Can,
        }
    }

    /// The device end of a request: `to` for RS-form, `id` for CAN-form.
    pub const fn target(self) -> u8 {
        match self {
            Self::Rs { to, .. } => to,
            Self::Can { id } => id,
        }
    }

    /// True when addressed to every device on the bus.
    pub const fn is_broadcast(self) -> bool {
        self.target() == WILDCARD_ID
    }

    /// Check that `reply` answers a request sent with this address.
    ///
    /// RS-form replies swap from/to; a broadcast request accepts any
    /// responder. CAN-form replies echo the id.
    pub fn check_reply(self, reply: Address) -> Result<()> {
        match (self, reply) {
            (Self::Rs { from: host, to: dev }, Self::Rs { from, to }) => {
                if dev != WILDCARD_ID && from != dev {
                    return Err(FrameError::MasterId {
                        expected: dev,
                        got: from,
                    });
                }
                if to != host {
                    return Err(FrameError::SlaveId {
                        expected: host,
                        got: to,
                    });
                }
                Ok(())
            }
            (Self::Can { id: dev }, Self::Can { id }) => {
                if dev != WILDCARD_ID && id != dev {
                    return Err(FrameError::MasterId { expected: dev, got: id });
                }
                Ok(())
            }
            (Self::Can { .. }, Self::Rs { .. }) => Err(FrameError::Head(reply.target())),
            (Self::Rs { .. }, Self::Can { .. }) => Err(FrameError::Head(CAN_SYNC)),
        }
    }
}

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub address: Address,
    /// Device-reported failure of the operation (set in replies).
    pub state: bool,
    pub rw: Rw,
    /// 7-bit command / register code.
    pub cmd: u8,
    pub data: Bytes,
}

impl Frame {
    /// Create a request frame with a clear state bit.
    pub fn new(address: Address, rw: Rw, cmd: u8, data: impl Into<Bytes>) -> Self {
        Self {
            address,
            state: false,
            rw,
            cmd,
            data: data.into(),
        }
    }

    pub fn with_state(mut self, state: bool) -> Self {
        self.state = state;
        self
    }

    pub fn variant(&self) -> Variant {
        self.address.variant()
    }

    /// Value of the wire length field: payload plus the rw/cmd byte.
    pub fn len_field(&self) -> usize {
        self.data.len() + 1
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        self.variant().min_frame_size() + self.data.len()
    }

    /// Id of the device that sent this frame, read as a reply.
    pub fn responder(&self) -> u8 {
        match self.address {
            Address::Rs { from, .. } => from,
            Address::Can { id } => id,
        }
    }

    /// Serialize into a fresh buffer.
    pub fn pack(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        encode_frame(self, &mut buf)?;
        Ok(buf.freeze())
    }
}

/// Encode a frame into the wire format, appending to `dst`.
///
/// Wire format (RS-form):
/// ```text
/// ┌────────┬────────┬─────────────┬────────────┬──────────┬──────────┐
/// │ from   │ to     │ state | len │ rw | cmd   │ data     │ crc16    │
/// │ (1B)   │ (1B)   │ (1b | 7b)   │ (1b | 7b)  │ (len-1)  │ (2B LE)  │
/// └────────┴────────┴─────────────┴────────────┴──────────┴──────────┘
/// ```
/// CAN-form replaces the two id bytes with `0xAA` plus a big-endian
/// `state:1,id:7` word and gives the length its own byte.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    let variant = frame.variant();
    if frame.data.len() > variant.max_data() {
        return Err(FrameError::PayloadTooLarge {
            size: frame.data.len(),
            max: variant.max_data(),
        });
    }

    if frame.cmd > 0x7F {
        return Err(FrameError::CmdRange(frame.cmd));
    }
    if let Address::Can { id } = frame.address {
        if id > 0x7F {
            return Err(FrameError::IdRange(id));
        }
    }

    let start = dst.len();
    dst.reserve(frame.wire_size());
    let len = frame.len_field() as u8;
    let state = u8::from(frame.state);
    match frame.address {
        Address::Rs { from, to } => {
            dst.put_u8(from);
            dst.put_u8(to);
            dst.put_u8(state << 7 | (len & 0x7F));
        }
        Address::Can { id } => {
            dst.put_u8(CAN_SYNC);
            dst.put_u16(u16::from(state) << 7 | u16::from(id));
            dst.put_u8(len & 0x0F);
        }
    }
    dst.put_u8(frame.rw.bit() | frame.cmd);
    dst.put_slice(&frame.data);

    let crc = checksum(&dst[start..]);
    dst.put_slice(&crc);
    Ok(())
}

/// Serialize a frame.
pub fn pack(frame: &Frame) -> Result<Bytes> {
    frame.pack()
}

/// Parse and validate one complete frame.
///
/// Checks, in order: minimum size, checksum over everything but the trailing
/// two bytes, CAN sync byte, then agreement of the length field with the
/// buffer size.
pub fn unpack(buf: &[u8], variant: Variant) -> Result<Frame> {
    let min = variant.min_frame_size();
    if buf.len() < min {
        return Err(FrameError::Len {
            expected: min,
            actual: buf.len(),
        });
    }

    let (body, tail) = buf.split_at(buf.len() - CHECKSUM_SIZE);
    let computed = crc16(body);
    let received = u16::from_le_bytes([tail[0], tail[1]]);
    if computed != received {
        return Err(FrameError::Crc {
            expected: computed,
            got: received,
        });
    }

    let (address, state, len) = match variant {
        Variant::Rs => (
            Address::Rs {
                from: buf[0],
                to: buf[1],
            },
            buf[2] & 0x80 != 0,
            usize::from(buf[2] & 0x7F),
        ),
        Variant::Can => {
            if buf[0] != CAN_SYNC {
                return Err(FrameError::Head(buf[0]));
            }
            let word = u16::from_be_bytes([buf[1], buf[2]]);
            (
                Address::Can {
                    id: (word & 0x7F) as u8,
                },
                word & 0x80 != 0,
                usize::from(buf[3] & 0x0F),
            )
        }
    };

    let header = variant.header_size();
    let expected = header - 1 + len + CHECKSUM_SIZE;
    if len == 0 || len > usize::from(variant.max_len_field()) || buf.len() != expected {
        return Err(FrameError::Len {
            expected,
            actual: buf.len(),
        });
    }

    let opcode = buf[header - 1];
    Ok(Frame {
        address,
        state,
        rw: Rw::from_bit(opcode),
        cmd: opcode & 0x7F,
        data: Bytes::copy_from_slice(&buf[header..expected - CHECKSUM_SIZE]),
    })
}

/// Unpack a frame received in answer to a request sent with `request`.
///
/// Adds the addressing check on top of [`unpack`].
pub fn unpack_reply(buf: &[u8], request: Address) -> Result<Frame> {
    let frame = unpack(buf, request.variant())?;
    request.check_reply(frame.address)?;
    Ok(frame)
}
