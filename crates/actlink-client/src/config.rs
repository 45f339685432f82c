use std::time::Duration;

use actlink_frame::HOST_ID;

/// Configuration for a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// This host's id on an RS-form bus. Default: 0xAA.
    pub host_id: u8,
    /// Reply timeout used when a call passes `None`. Default: 1 s.
    pub timeout: Duration,
    /// Reply timeout for each link negotiation attempt. Default: 2 s.
    pub negotiate_timeout: Duration,
    /// Negotiation frames sent before giving up. Default: 2.
    pub negotiate_attempts: u32,
    /// Bus baud rate the adapter should switch to; `None` keeps its current rate.
    pub baud: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host_id: HOST_ID,
            timeout: Duration::from_secs(1),
            negotiate_timeout: Duration::from_secs(2),
            negotiate_attempts: 2,
            baud: None,
        }
    }
}
