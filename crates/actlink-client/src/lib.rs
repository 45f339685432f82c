//! Request/response client for master/slave actuator buses.
//!
//! Sits on top of `actlink-transport` and `actlink-frame`: builds requests
//! from register [`Descriptor`]s, pairs every request with its reply, and
//! reports failures as a [`Status`] kind. Broadcast reads over an id range,
//! adapter link negotiation and a raw [`DataLink`] relay live here too.

pub mod client;
pub mod config;
pub mod connector;
pub mod datalink;
pub mod error;
pub mod register;
pub mod status;

pub use client::{Client, Reply, Session, Slot, DEFAULT_DEVICE_ID};
pub use config::ClientConfig;
pub use connector::{connect, connect_with_config, Endpoint, DEFAULT_TCP_PORT, DEFAULT_UDP_PORT};
pub use datalink::{reset_net, CanRecord, DataLink, RESET_SETTLE, USB_MODE_SETTLE};
pub use error::{ClientError, Result};
pub use register::{Descriptor, FieldLen};
pub use status::Status;
