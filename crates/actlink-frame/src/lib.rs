//! Wire framing for the actuator bus protocol.
//!
//! Two layouts share one checksum and one reassembly strategy:
//! - RS-form: `from | to | state:1,len:7 | rw:1,cmd:7 | data | crc16`
//! - CAN-form: `0xAA | 0x00 | state:1,id:7 | len | rw:1,cmd:7 | data | crc16`
//!
//! [`FrameDecoder`] plugs into an `actlink_transport::Transport` and turns an
//! arbitrarily chunked byte stream into checksum-valid frames.

pub mod checksum;
pub mod codec;
pub mod decoder;
pub mod error;

pub use checksum::{checksum, crc16};
pub use codec::{
    encode_frame, pack, unpack, unpack_reply, Address, Frame, Rw, Variant, CAN_SYNC,
    CHECKSUM_SIZE, HOST_ID, NEGOTIATE_CMD, WILDCARD_ID,
};
pub use decoder::FrameDecoder;
pub use error::{FrameError, Result};
