use std::path::PathBuf;
use std::time::Duration;

use actlink_client::{connect_with_config, Client, ClientConfig, Endpoint};
use actlink_frame::Variant;
use actlink_transport::TransportConfig;
use clap::{Args, Subcommand, ValueEnum};

use crate::exit::{client_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod ping;
pub mod read;
pub mod scan;
pub mod version;
pub mod watch;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open an endpoint and negotiate the link with the bus adapter.
    Ping(PingArgs),
    /// Read a register from one device.
    Read(ReadArgs),
    /// Write a register on one device.
    Write(WriteArgs),
    /// Broadcast a read and list every device that answers.
    Scan(ScanArgs),
    /// Poll a register until interrupted.
    Watch(WatchArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ping(args) => ping::run(args, format),
        Command::Read(args) => read::run(args, format),
        Command::Write(args) => write::run(args, format),
        Command::Scan(args) => scan::run(args, format),
        Command::Watch(args) => watch::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Bus {
    /// RS485 actuators (RS-form frames).
    Rs,
    /// CAN actuators (CAN-form frames).
    Can,
}

impl From<Bus> for Variant {
    fn from(bus: Bus) -> Self {
        match bus {
            Bus::Rs => Variant::Rs,
            Bus::Can => Variant::Can,
        }
    }
}

/// Where the adapter is and how to talk to the device.
#[derive(Args, Debug, Clone)]
pub struct LinkArgs {
    /// Serial port of a USB bus adapter.
    #[arg(long, value_name = "PATH", conflicts_with_all = ["device", "tcp", "udp"])]
    pub serial: Option<PathBuf>,
    /// Serial line speed for --serial.
    #[arg(long, default_value_t = 921_600)]
    pub baud: u32,
    /// Character device with fixed line settings.
    #[arg(long, value_name = "PATH", conflicts_with_all = ["serial", "tcp", "udp"])]
    pub device: Option<PathBuf>,
    /// Ethernet adapter over TCP (HOST or HOST:PORT, default port 6001).
    #[arg(long, value_name = "ADDR", conflicts_with_all = ["serial", "device", "udp"])]
    pub tcp: Option<String>,
    /// Ethernet adapter over UDP (HOST or HOST:PORT, default port 5001).
    #[arg(long, value_name = "ADDR", conflicts_with_all = ["serial", "device", "tcp"])]
    pub udp: Option<String>,
    /// Frame format spoken on the bus.
    #[arg(long, value_enum, default_value = "rs")]
    pub bus: Bus,
    /// Device id to address.
    #[arg(long, default_value_t = 1)]
    pub id: u8,
    /// Reply timeout (e.g. 1s, 300ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
    /// Bus baud rate a network or CAN adapter should switch to.
    #[arg(long, value_name = "BAUD")]
    pub bus_baud: Option<u32>,
}

impl LinkArgs {
    pub fn endpoint(&self) -> CliResult<Endpoint> {
        if let Some(path) = &self.serial {
            return Ok(Endpoint::Serial {
                path: path.clone(),
                baud: self.baud,
            });
        }
        if let Some(path) = &self.device {
            return Ok(Endpoint::CharDevice { path: path.clone() });
        }
        if let Some(addr) = &self.tcp {
            return Ok(Endpoint::tcp(addr));
        }
        if let Some(addr) = &self.udp {
            return Ok(Endpoint::udp(addr));
        }
        Err(CliError::usage(
            "an endpoint is required: --serial, --device, --tcp or --udp",
        ))
    }

    pub fn client_config(&self) -> CliResult<ClientConfig> {
        Ok(ClientConfig {
            timeout: parse_duration(&self.timeout)?,
            baud: self.bus_baud,
            ..ClientConfig::default()
        })
    }

    /// Connect and point the client at `--id`.
    pub fn open(&self) -> CliResult<(Client, Endpoint)> {
        let endpoint = self.endpoint()?;
        let client = connect_with_config(
            &endpoint,
            self.bus.into(),
            &self.client_config()?,
            &TransportConfig::default(),
        )
        .map_err(|err| client_error(&format!("connect to {endpoint} failed"), err))?;
        client.connect_to(self.id, 0);
        Ok((client, endpoint))
    }
}

#[derive(Args, Debug)]
pub struct PingArgs {
    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Register command code (e.g. 0x30 or 48).
    #[arg(long, value_parser = parse_cmd)]
    pub cmd: u8,
    /// Response payload size in bytes.
    #[arg(long)]
    pub len: usize,
    /// Request argument as hex (e.g. "0102").
    #[arg(long, value_parser = parse_hex)]
    pub arg: Option<HexBytes>,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Register command code (e.g. 0x30 or 48).
    #[arg(long, value_parser = parse_cmd)]
    pub cmd: u8,
    /// Payload as hex (e.g. "42480000").
    #[arg(long, value_parser = parse_hex)]
    pub data: HexBytes,
    /// Response payload size in bytes.
    #[arg(long, default_value_t = 0)]
    pub len: usize,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Register command code to broadcast.
    #[arg(long, value_parser = parse_cmd)]
    pub cmd: u8,
    /// Response payload size in bytes.
    #[arg(long)]
    pub len: usize,
    /// First device id.
    #[arg(long, default_value_t = 1)]
    pub from: u8,
    /// Last device id.
    #[arg(long, default_value_t = 8)]
    pub to: u8,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Register command code (e.g. 0x30 or 48).
    #[arg(long, value_parser = parse_cmd)]
    pub cmd: u8,
    /// Response payload size in bytes.
    #[arg(long)]
    pub len: usize,
    /// Request argument as hex.
    #[arg(long, value_parser = parse_hex)]
    pub arg: Option<HexBytes>,
    /// Time between reads (e.g. 500ms, 2s).
    #[arg(long, default_value = "500ms")]
    pub interval: String,
    /// Exit after N reads.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Byte string given on the command line as hex.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl HexBytes {
    pub fn bytes(arg: &Option<HexBytes>) -> &[u8] {
        arg.as_ref().map_or(&[], |hex| hex.0.as_slice())
    }
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Parse a byte given as decimal or `0x` hex.
pub fn parse_byte(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("not a byte value: {input}"))
}

/// Parse a 7-bit command code.
pub fn parse_cmd(input: &str) -> Result<u8, String> {
    match parse_byte(input)? {
        cmd @ 0..=0x7F => Ok(cmd),
        cmd => Err(format!("command code 0x{cmd:02X} exceeds 0x7F")),
    }
}

/// Parse hex bytes; spaces, commas and `0x` prefixes are ignored.
pub fn parse_hex(input: &str) -> Result<HexBytes, String> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|chunk| {
            chunk
                .strip_prefix("0x")
                .or_else(|| chunk.strip_prefix("0X"))
                .unwrap_or(chunk)
        })
        .collect();
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in {input:?}"));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid hex in {input:?}"))
        })
        .collect::<Result<Vec<u8>, String>>()
        .map(HexBytes)
}
