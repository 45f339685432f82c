use actlink_client::{Descriptor, Slot, Status};
use serde::Serialize;

use crate::cmd::ScanArgs;
use crate::exit::{client_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{hex, print_json, table, OutputFormat};

#[derive(Serialize)]
struct SlotOutput {
    id: u8,
    status: Status,
    code: i32,
    data: String,
}

#[derive(Serialize)]
struct ScanOutput {
    cmd: u8,
    from: u8,
    to: u8,
    answered: usize,
    slots: Vec<SlotOutput>,
}

impl From<&Slot> for SlotOutput {
    fn from(slot: &Slot) -> Self {
        Self {
            id: slot.id,
            status: slot.status,
            code: slot.status.code(),
            data: hex(&slot.data),
        }
    }
}

pub fn run(args: ScanArgs, format: OutputFormat) -> CliResult<i32> {
    if args.from > args.to {
        return Err(CliError::new(
            USAGE,
            format!("--from {} is greater than --to {}", args.from, args.to),
        ));
    }
    let (client, _) = args.link.open()?;
    let descriptor = Descriptor::new(args.cmd).read(2, args.len);

    let slots = client
        .get_range(&descriptor, args.from, args.to)
        .map_err(|err| client_error("broadcast read failed", err))?;
    client.close();

    let out = ScanOutput {
        cmd: args.cmd,
        from: args.from,
        to: args.to,
        answered: slots.iter().filter(|s| s.status != Status::Timeout).count(),
        slots: slots.iter().map(SlotOutput::from).collect(),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut t = table(&["ID", "STATUS", "DATA"]);
            for slot in &out.slots {
                t.add_row(vec![slot.id.to_string(), slot.status.to_string(), slot.data.clone()]);
            }
            println!("{t}");
        }
        OutputFormat::Pretty => {
            println!(
                "Scan 0x{:02X} ids {}..={}: {} answered",
                out.cmd, out.from, out.to, out.answered
            );
            for slot in &out.slots {
                println!("  {:>3}  {:<9} {}", slot.id, slot.status.as_str(), slot.data);
            }
        }
        OutputFormat::Raw => {
            for slot in out.slots.iter().filter(|s| s.status.is_ok()) {
                println!("{}", slot.id);
            }
        }
    }

    Ok(if out.answered == 0 { TIMEOUT } else { SUCCESS })
}
