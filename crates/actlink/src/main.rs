mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "actlink", version, about = "Actuator bus diagnostics")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_read_subcommand() {
        let cli = Cli::try_parse_from([
            "actlink", "read", "--tcp", "192.168.1.20", "--cmd", "0x30", "--len", "4",
        ])
        .expect("read args should parse");

        let Command::Read(args) = cli.command else {
            panic!("expected read");
        };
        assert_eq!(args.cmd, 0x30);
        assert_eq!(args.link.id, 1);
        assert!(args.arg.is_none());
    }

    #[test]
    fn rejects_two_endpoints() {
        let err = Cli::try_parse_from([
            "actlink", "ping", "--tcp", "10.0.0.1", "--udp", "10.0.0.1",
        ])
        .expect_err("conflicting endpoints should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_write_with_hex_payload() {
        let cli = Cli::try_parse_from([
            "actlink", "--format", "json", "write", "--serial", "/dev/ttyUSB0", "--bus", "can",
            "--id", "3", "--cmd", "48", "--data", "42480000",
        ])
        .expect("write args should parse");

        let Command::Write(args) = cli.command else {
            panic!("expected write");
        };
        assert_eq!(args.data.0, vec![0x42, 0x48, 0x00, 0x00]);
        assert_eq!(args.link.bus, cmd::Bus::Can);
        assert_eq!(args.link.id, 3);
    }

    #[test]
    fn rejects_bad_hex() {
        let err = Cli::try_parse_from([
            "actlink", "write", "--tcp", "h", "--cmd", "1", "--data", "4g",
        ])
        .expect_err("bad hex should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
