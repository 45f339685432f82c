//! Host-side client for master/slave actuator buses.
//!
//! actlink talks to RS485 and CAN actuators through USB serial adapters and
//! Ethernet bus adapters: it frames requests, checks CRCs, pairs replies with
//! requests and reports every failure as a [`client::Status`] kind.
//!
//! # Crate Structure
//!
//! - [`transport`]: channels (serial, char device, TCP, UDP) with a background reader
//! - [`frame`]: RS-form and CAN-form codec, CRC16 and the streaming decoder
//! - [`client`]: send/pend correlation, broadcast reads, link negotiation
//!   (behind the `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use actlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use actlink_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use actlink_client::*;
}
