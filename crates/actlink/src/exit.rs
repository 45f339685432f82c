use std::fmt;
use std::io;

use actlink_client::{ClientError, Status};
use actlink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
/// The device answered with a NACK.
pub const DEVICE_REJECTED: i32 = 4;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: &io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Exit code for a status kind.
pub fn status_code(status: Status) -> i32 {
    match status {
        Status::Ok => SUCCESS,
        Status::Timeout => TIMEOUT,
        Status::State => DEVICE_REJECTED,
        Status::Connect | Status::Dead => TRANSPORT_ERROR,
        Status::Head
        | Status::MasterId
        | Status::SlaveId
        | Status::Len
        | Status::Rw
        | Status::Cmd
        | Status::Crc => DATA_INVALID,
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match &err {
        ClientError::Transport(
            TransportError::Open { source, .. } | TransportError::Connect { source, .. },
        ) => io_error(context, source),
        ClientError::PayloadLength { .. } | ClientError::Unsupported { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        _ => CliError::new(
            status_code(err.status()),
            format!("{context}: {err} [{}]", err.status()),
        ),
    }
}
