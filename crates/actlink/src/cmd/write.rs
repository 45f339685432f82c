use actlink_client::Descriptor;
use actlink_frame::Rw;
use tracing::debug;

use crate::cmd::read::{print_register, RegisterOutput};
use crate::cmd::WriteArgs;
use crate::exit::{client_error, status_code, CliResult};
use crate::output::OutputFormat;

pub fn run(args: WriteArgs, format: OutputFormat) -> CliResult<i32> {
    let (client, _) = args.link.open()?;
    let payload = args.data.0.as_slice();
    let descriptor = Descriptor::new(args.cmd).write(payload.len(), args.len);
    debug!(cmd = args.cmd, len = payload.len(), id = args.link.id, "writing register");

    let reply = client
        .transact(Rw::Write, &descriptor, payload, None)
        .map_err(|err| client_error(&format!("write 0x{:02X} failed", args.cmd), err))?;
    client.close();

    let out = RegisterOutput::from_reply(Rw::Write, &reply);
    print_register(&out, reply.data(), format);
    Ok(status_code(reply.status()))
}
