use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use actlink_frame::{FrameDecoder, Variant, WILDCARD_ID};
use actlink_transport::{StreamDecoder, Transport, TransportConfig};
use tracing::{info, warn};

use crate::client::{Client, DEFAULT_DEVICE_ID};
use crate::config::ClientConfig;
use crate::error::Result;

/// TCP port of the Ethernet bus adapter.
pub const DEFAULT_TCP_PORT: u16 = 6001;
/// UDP port of the Ethernet bus adapter.
pub const DEFAULT_UDP_PORT: u16 = 5001;

/// Where the bus adapter lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// USB-to-bus serial adapter.
    Serial { path: PathBuf, baud: u32 },
    /// Character device whose line settings are already configured.
    CharDevice { path: PathBuf },
    /// Ethernet adapter over TCP, `host:port`.
    Tcp(String),
    /// Ethernet adapter over UDP, `host:port`.
    Udp(String),
}

impl Endpoint {
    /// TCP endpoint, filling in [`DEFAULT_TCP_PORT`] when `addr` has none.
    pub fn tcp(addr: &str) -> Self {
        Self::Tcp(with_default_port(addr, DEFAULT_TCP_PORT))
    }

    /// UDP endpoint, filling in [`DEFAULT_UDP_PORT`] when `addr` has none.
    pub fn udp(addr: &str) -> Self {
        Self::Udp(with_default_port(addr, DEFAULT_UDP_PORT))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Serial { .. } => "serial",
            Self::CharDevice { .. } => "char-device",
            Self::Tcp(_) => "tcp",
            Self::Udp(_) => "udp",
        }
    }

    /// Whether the adapter expects link negotiation on this bus.
    ///
    /// Ethernet adapters always do; serial adapters only on a CAN-form bus.
    pub fn negotiates(&self, variant: Variant) -> bool {
        match self {
            Self::Tcp(_) | Self::Udp(_) => true,
            Self::Serial { .. } | Self::CharDevice { .. } => variant == Variant::Can,
        }
    }

    /// Open the channel with the given decoder.
    pub fn open(
        &self,
        decoder: Option<Box<dyn StreamDecoder>>,
        config: &TransportConfig,
    ) -> Result<Transport> {
        let transport = match self {
            #[cfg(unix)]
            Self::Serial { path, baud } => Transport::serial(path, *baud, decoder, config)?,
            #[cfg(unix)]
            Self::CharDevice { path } => Transport::char_device(path, decoder, config)?,
            #[cfg(not(unix))]
            Self::Serial { path, .. } | Self::CharDevice { path } => {
                let _ = (decoder, config);
                return Err(actlink_transport::TransportError::Open {
                    path: path.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::Unsupported,
                        "serial devices are only supported on Unix",
                    ),
                }
                .into());
            }
            Self::Tcp(addr) => Transport::tcp(addr.as_str(), decoder, config)?,
            Self::Udp(addr) => Transport::udp(addr.as_str(), decoder, config)?,
        };
        Ok(transport)
    }

    /// The frame decoder a client on this endpoint needs.
    ///
    /// Datagrams already carry one frame each and skip decoding.
    fn decoder(&self, variant: Variant, config: &ClientConfig) -> Option<Box<dyn StreamDecoder>> {
        if matches!(self, Self::Udp(_)) {
            return None;
        }
        let decoder = match variant {
            Variant::Rs if self.negotiates(variant) => {
                FrameDecoder::rs(WILDCARD_ID, config.host_id)
            }
            Variant::Rs => FrameDecoder::rs(DEFAULT_DEVICE_ID, config.host_id),
            Variant::Can => FrameDecoder::can(),
        };
        Some(Box::new(decoder))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial { path, baud } => write!(f, "serial:{}@{baud}", path.display()),
            Self::CharDevice { path } => write!(f, "device:{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp:{addr}"),
            Self::Udp(addr) => write!(f, "udp:{addr}"),
        }
    }
}

/// Append `port` to a bare host or IP address.
fn with_default_port(addr: &str, port: u16) -> String {
    if addr.parse::<SocketAddr>().is_ok() {
        return addr.to_string();
    }
    if let Ok(ip) = addr.parse::<IpAddr>() {
        return SocketAddr::new(ip, port).to_string();
    }
    if addr.contains(':') {
        addr.to_string()
    } else {
        format!("{addr}:{port}")
    }
}

/// Open `endpoint` and return a ready client targeting device 1.
pub fn connect(endpoint: &Endpoint, variant: Variant) -> Result<Client> {
    connect_with_config(
        endpoint,
        variant,
        &ClientConfig::default(),
        &TransportConfig::default(),
    )
}

/// Open `endpoint` with explicit configuration.
///
/// Runs link negotiation where the adapter expects it; a failed
/// negotiation closes the channel and returns the error.
pub fn connect_with_config(
    endpoint: &Endpoint,
    variant: Variant,
    config: &ClientConfig,
    transport_config: &TransportConfig,
) -> Result<Client> {
    let transport = endpoint.open(endpoint.decoder(variant, config), transport_config)?;
    let client = Client::new(transport, variant, config.clone());

    if endpoint.negotiates(variant) {
        if let Err(err) = client.connect_device() {
            warn!(%endpoint, error = %err, "closing connection after failed negotiation");
            client.close();
            return Err(err);
        }
    }

    info!(%endpoint, %variant, "connected");
    Ok(client)
}
