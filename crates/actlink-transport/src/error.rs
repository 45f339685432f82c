use std::path::PathBuf;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open a device node (serial port or character device).
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to a network endpoint.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// The requested baud rate has no termios equivalent on this platform.
    #[error("unsupported baud rate {0}")]
    UnsupportedBaud(u32),

    /// An I/O error occurred on the channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The background reader hit an I/O error; the channel is dead.
    #[error("transport is dead (reader failed)")]
    Dead,

    /// The transport has been closed.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// True for the terminal states a transport never recovers from.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Dead | Self::Shutdown)
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
