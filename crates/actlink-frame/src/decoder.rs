use actlink_transport::StreamDecoder;
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{trace, warn};

use crate::checksum::crc16;
use crate::codec::{Variant, CAN_SYNC, CHECKSUM_SIZE, WILDCARD_ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    AwaitFrom,
    /// Addressing bytes after the first; the count left is in `addr_left`.
    AwaitTo,
    AwaitLen,
    AwaitData,
    AwaitCrc1,
    AwaitCrc2,
}

/// Byte-at-a-time frame reassembler.
///
/// Bytes are consumed exactly once: a mismatch drops back to
/// waiting for a from-byte without re-scanning what was already eaten.
/// Partial frames survive across `feed` calls, so output does not depend on
/// how the stream was chunked.
#[derive(Debug)]
pub struct FrameDecoder {
    variant: Variant,
    from: u8,
    to: u8,
    max_len: u8,
    state: RxState,
    addr_left: u8,
    remaining: usize,
    buf: BytesMut,
}

impl FrameDecoder {
    /// RS-form decoder accepting frames sent by `from` (or anyone, if
    /// `from` is the wildcard) and addressed to `to`.
    pub fn rs(from: u8, to: u8) -> Self {
        Self::new(Variant::Rs, from, to)
    }

    /// CAN-form decoder; frames are recognized by the sync byte.
    pub fn can() -> Self {
        Self::new(Variant::Can, CAN_SYNC, 0)
    }

    fn new(variant: Variant, from: u8, to: u8) -> Self {
        Self {
            variant,
            from,
            to,
            max_len: variant.max_len_field(),
            state: RxState::AwaitFrom,
            addr_left: 0,
            remaining: 0,
            buf: BytesMut::with_capacity(variant.min_frame_size() + variant.max_data()),
        }
    }

    /// Cap the accepted length field; larger values abort the frame.
    pub fn with_max_len(mut self, max_len: u8) -> Self {
        self.max_len = max_len.clamp(1, self.variant.max_len_field());
        self
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Decode `bytes`, returning every completed frame.
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<Bytes> {
        let mut out = Vec::new();
        self.feed(bytes, &mut |frame| out.push(frame));
        out
    }

    fn restart(&mut self) {
        self.state = RxState::AwaitFrom;
        self.buf.clear();
    }

    fn accepts_from(&self, byte: u8) -> bool {
        match self.variant {
            Variant::Rs => byte == self.from || self.from == WILDCARD_ID,
            Variant::Can => byte == CAN_SYNC,
        }
    }

    fn step(&mut self, byte: u8, sink: &mut dyn FnMut(Bytes)) {
        match self.state {
            RxState::AwaitFrom => {
                if self.accepts_from(byte) {
                    self.buf.clear();
                    self.buf.put_u8(byte);
                    self.addr_left = match self.variant {
                        Variant::Rs => 1,
                        Variant::Can => 2,
                    };
                    self.state = RxState::AwaitTo;
                } else {
                    trace!(byte, "skipping byte outside frame");
                }
            }
            RxState::AwaitTo => {
                if self.variant == Variant::Rs && byte != self.to {
                    trace!(byte, expected = self.to, "to-id mismatch");
                    self.restart();
                    return;
                }
                self.buf.put_u8(byte);
                self.addr_left -= 1;
                if self.addr_left == 0 {
                    self.state = RxState::AwaitLen;
                }
            }
            RxState::AwaitLen => {
                let len = match self.variant {
                    Variant::Rs => byte & 0x7F,
                    Variant::Can => byte & 0x0F,
                };
                if len == 0 || len > self.max_len {
                    trace!(len, max = self.max_len, "length out of range");
                    self.restart();
                    return;
                }
                self.buf.put_u8(byte);
                self.remaining = usize::from(len);
                self.state = RxState::AwaitData;
            }
            RxState::AwaitData => {
                self.buf.put_u8(byte);
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.state = RxState::AwaitCrc1;
                }
            }
            RxState::AwaitCrc1 => {
                self.buf.put_u8(byte);
                self.state = RxState::AwaitCrc2;
            }
            RxState::AwaitCrc2 => {
                self.buf.put_u8(byte);
                self.state = RxState::AwaitFrom;

                let body_len = self.buf.len() - CHECKSUM_SIZE;
                let computed = crc16(&self.buf[..body_len]);
                let received = u16::from_le_bytes([self.buf[body_len], self.buf[body_len + 1]]);
                if computed == received {
                    sink(self.buf.split().freeze());
                } else {
                    warn!(
                        computed,
                        received,
                        len = self.buf.len(),
                        "dropping frame with bad checksum"
                    );
                    self.buf.clear();
                }
            }
        }
    }
}

impl StreamDecoder for FrameDecoder {
    fn feed(&mut self, bytes: &[u8], sink: &mut dyn FnMut(Bytes)) {
        for &byte in bytes {
            self.step(byte, sink);
        }
    }

    fn reset(&mut self, from: Option<u8>, to: Option<u8>) {
        self.restart();
        if self.variant == Variant::Rs {
            if let Some(from) = from {
                self.from = from;
            }
            if let Some(to) = to {
                self.to = to;
            }
        }
    }
}
