use std::fmt;

use actlink_frame::FrameError;
use serde::{Deserialize, Serialize};

/// Outcome of one protocol operation.
///
/// Every failure the stack can produce collapses into one of these kinds.
/// [`Status::code`] gives the integer codes wrapper layers expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    /// CAN-form sync byte mismatch.
    Head,
    /// Reply came from an unexpected device.
    MasterId,
    /// Reply was addressed to someone else.
    SlaveId,
    Timeout,
    /// The device rejected the operation (NACK); the frame itself is valid.
    State,
    Len,
    Rw,
    Cmd,
    Crc,
    /// Link negotiation failed.
    Connect,
    /// The connection is closed or its channel failed.
    Dead,
}

impl Status {
    pub const fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Head | Self::MasterId => -1,
            Self::SlaveId => -2,
            Self::Timeout => -3,
            Self::State => -4,
            Self::Len => -5,
            Self::Rw => -6,
            Self::Cmd => -7,
            Self::Crc => -8,
            Self::Connect => -9,
            Self::Dead => -999,
        }
    }

    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Head => "head",
            Self::MasterId => "master_id",
            Self::SlaveId => "slave_id",
            Self::Timeout => "timeout",
            Self::State => "state",
            Self::Len => "len",
            Self::Rw => "rw",
            Self::Cmd => "cmd",
            Self::Crc => "crc",
            Self::Connect => "connect",
            Self::Dead => "dead",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&FrameError> for Status {
    fn from(err: &FrameError) -> Self {
        match err {
            FrameError::Len { .. } | FrameError::PayloadTooLarge { .. } => Self::Len,
            FrameError::Head(_) => Self::Head,
            FrameError::MasterId { .. } => Self::MasterId,
            FrameError::SlaveId { .. } => Self::SlaveId,
            FrameError::Crc { .. } => Self::Crc,
            FrameError::CmdRange(_) => Self::Cmd,
            FrameError::IdRange(_) => Self::SlaveId,
        }
    }
}
