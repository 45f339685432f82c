//! Physical channel layer for actlink.
//!
//! Provides one byte-channel abstraction over the links an actuator bus is
//! reachable through:
//! - Serial ports and USB serial bridges (termios raw mode)
//! - Character devices used as-is
//! - TCP streams and UDP datagram peers (network gateways)
//! - Unix streams (local relays and tests)
//!
//! A [`Transport`] owns a background reader that feeds a [`StreamDecoder`]
//! and queues completed frames in a bounded drop-oldest [`FrameQueue`].
//! Everything else in actlink builds on top of it.

#[cfg(unix)]
pub mod device;
pub mod error;
pub mod net;
pub mod queue;
pub mod traits;
pub mod transport;

pub use error::{Result, TransportError};
pub use queue::FrameQueue;
pub use traits::{LinkStream, StreamDecoder};
pub use transport::{Transport, TransportConfig};
