use std::time::Instant;

use serde::Serialize;

use crate::cmd::PingArgs;
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_json, table, OutputFormat};

#[derive(Serialize)]
struct PingOutput {
    endpoint: String,
    transport: &'static str,
    bus: &'static str,
    negotiated: bool,
    elapsed_ms: f64,
}

pub fn run(args: PingArgs, format: OutputFormat) -> CliResult<i32> {
    let started = Instant::now();
    let (client, endpoint) = args.link.open()?;

    // connect() only negotiates where the adapter requires it; ping always does.
    if !endpoint.negotiates(client.variant()) {
        client
            .connect_device()
            .map_err(|err| client_error("link negotiation failed", err))?;
    }
    let elapsed_ms = (started.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0;

    let out = PingOutput {
        endpoint: endpoint.to_string(),
        transport: client.transport().kind(),
        bus: client.variant().name(),
        negotiated: true,
        elapsed_ms,
    };
    client.close();

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut t = table(&["ENDPOINT", "TRANSPORT", "BUS", "TIME"]);
            t.add_row(vec![
                out.endpoint.clone(),
                out.transport.to_string(),
                out.bus.to_string(),
                format!("{:.2}ms", out.elapsed_ms),
            ]);
            println!("{t}");
        }
        OutputFormat::Pretty => {
            println!("Link OK:");
            println!("  Endpoint:  {}", out.endpoint);
            println!("  Transport: {}", out.transport);
            println!("  Bus:       {}", out.bus);
            println!("  Time:      {:.2}ms", out.elapsed_ms);
        }
        OutputFormat::Raw => println!("ok"),
    }
    Ok(SUCCESS)
}
