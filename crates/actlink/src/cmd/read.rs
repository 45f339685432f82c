use actlink_client::{Descriptor, Reply, Status};
use actlink_frame::Rw;
use serde::Serialize;

use crate::cmd::{HexBytes, ReadArgs};
use crate::exit::{client_error, status_code, CliResult};
use crate::output::{hex, now_unix_millis, print_json, print_raw, table, OutputFormat};

/// One register access as printed by `read`, `write` and `watch`.
#[derive(Serialize)]
pub struct RegisterOutput {
    pub id: u8,
    pub cmd: u8,
    pub rw: &'static str,
    pub status: Status,
    pub code: i32,
    pub data: String,
    pub timestamp_ms: u128,
}

impl RegisterOutput {
    pub fn from_reply(rw: Rw, reply: &Reply) -> Self {
        let frame = reply.frame();
        Self {
            id: reply.responder(),
            cmd: frame.cmd,
            rw: rw_name(rw),
            status: reply.status(),
            code: reply.status().code(),
            data: hex(reply.data()),
            timestamp_ms: now_unix_millis(),
        }
    }

    /// A request that got no usable reply.
    pub fn failed(id: u8, cmd: u8, rw: Rw, status: Status) -> Self {
        Self {
            id,
            cmd,
            rw: rw_name(rw),
            status,
            code: status.code(),
            data: String::new(),
            timestamp_ms: now_unix_millis(),
        }
    }
}

fn rw_name(rw: Rw) -> &'static str {
    match rw {
        Rw::Read => "read",
        Rw::Write => "write",
    }
}

pub fn print_register(out: &RegisterOutput, raw: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut t = table(&["ID", "CMD", "RW", "STATUS", "DATA"]);
            t.add_row(vec![
                out.id.to_string(),
                format!("0x{:02X}", out.cmd),
                out.rw.to_string(),
                out.status.to_string(),
                out.data.clone(),
            ]);
            println!("{t}");
        }
        OutputFormat::Pretty => {
            println!(
                "id={} cmd=0x{:02X} {} status={} data={}",
                out.id, out.cmd, out.rw, out.status, out.data
            );
        }
        OutputFormat::Raw => print_raw(raw),
    }
}

pub fn run(args: ReadArgs, format: OutputFormat) -> CliResult<i32> {
    let (client, _) = args.link.open()?;
    let request = HexBytes::bytes(&args.arg);
    let descriptor = Descriptor::new(args.cmd).read(request.len(), args.len);

    let reply = client
        .transact(Rw::Read, &descriptor, request, None)
        .map_err(|err| client_error(&format!("read 0x{:02X} failed", args.cmd), err))?;
    client.close();

    let out = RegisterOutput::from_reply(Rw::Read, &reply);
    print_register(&out, reply.data(), format);
    Ok(status_code(reply.status()))
}
