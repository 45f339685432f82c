/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The buffer is too short, or its size disagrees with the length field.
    #[error("frame length mismatch (expected {expected} bytes, got {actual})")]
    Len { expected: usize, actual: usize },

    /// A CAN-form frame does not start with the sync byte.
    #[error("invalid frame head 0x{0:02X} (expected 0xAA)")]
    Head(u8),

    /// The responder id is not the device the request was sent to.
    #[error("unexpected responder id 0x{got:02X} (expected 0x{expected:02X})")]
    MasterId { expected: u8, got: u8 },

    /// The reply is not addressed to this host.
    #[error("unexpected destination id 0x{got:02X} (expected 0x{expected:02X})")]
    SlaveId { expected: u8, got: u8 },

    /// The trailing checksum does not match the frame contents.
    #[error("checksum mismatch (computed 0x{expected:04X}, received 0x{got:04X})")]
    Crc { expected: u16, got: u16 },

    /// The payload does not fit the variant's length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The command code does not fit its 7-bit field.
    #[error("command code 0x{0:02X} out of range (max 0x7F)")]
    CmdRange(u8),

    /// The CAN-form device id does not fit its 7-bit field.
    #[error("device id 0x{0:02X} out of range (max 0x7F)")]
    IdRange(u8),
}

pub type Result<T> = std::result::Result<T, FrameError>;
