use std::time::Duration;

use actlink_frame::{FrameError, Rw};
use actlink_transport::TransportError;

use crate::status::Status;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A received frame failed structural validation.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// No valid reply arrived in time.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// Reply direction differs from the request.
    #[error("reply direction {got:?} does not match request {expected:?}")]
    Rw { expected: Rw, got: Rw },

    /// Reply command differs from the request.
    #[error("reply command 0x{got:02X} does not match request 0x{expected:02X}")]
    Cmd { expected: u8, got: u8 },

    /// Reply payload size differs from what the register returns.
    #[error("reply carries {got} data bytes, expected {expected}")]
    Len { expected: usize, got: usize },

    /// Request payload size differs from what the register takes.
    #[error("request payload is {got} bytes, register takes {expected}")]
    PayloadLength { expected: usize, got: usize },

    /// The register does not support this direction.
    #[error("register 0x{cmd:02X} does not support {rw:?}")]
    Unsupported { cmd: u8, rw: Rw },

    /// The device answered with a NACK.
    #[error("device rejected command 0x{cmd:02X}")]
    Rejected { cmd: u8 },

    /// Link negotiation with the bus adapter failed.
    #[error("link negotiation failed after {attempts} attempt(s): {source}")]
    Connect {
        attempts: u32,
        #[source]
        source: Box<ClientError>,
    },

    /// The connection is closed or its channel failed earlier.
    #[error("connection is dead")]
    Dead,
}

impl ClientError {
    /// The status kind this error reports as.
    pub fn status(&self) -> Status {
        match self {
            Self::Transport(err) => match err {
                TransportError::Open { .. }
                | TransportError::Connect { .. }
                | TransportError::UnsupportedBaud(_) => Status::Connect,
                TransportError::Io(_) | TransportError::Dead | TransportError::Shutdown => {
                    Status::Dead
                }
            },
            Self::Frame(err) => Status::from(err),
            Self::Timeout(_) => Status::Timeout,
            Self::Rw { .. } => Status::Rw,
            Self::Rejected { .. } => Status::State,
            Self::Cmd { .. } | Self::Unsupported { .. } => Status::Cmd,
            Self::Len { .. } | Self::PayloadLength { .. } => Status::Len,
            Self::Connect { .. } => Status::Connect,
            Self::Dead => Status::Dead,
        }
    }

    /// True when retrying on this connection cannot succeed.
    pub fn is_dead(&self) -> bool {
        self.status() == Status::Dead
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
