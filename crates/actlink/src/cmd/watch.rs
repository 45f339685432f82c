use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use actlink_client::Descriptor;
use actlink_frame::Rw;
use tracing::{debug, warn};

use crate::cmd::read::{print_register, RegisterOutput};
use crate::cmd::{parse_duration, HexBytes, WatchArgs};
use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::OutputFormat;

const TICK: Duration = Duration::from_millis(50);

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let (client, _) = args.link.open()?;
    let request = HexBytes::bytes(&args.arg);
    let descriptor = Descriptor::new(args.cmd).read(request.len(), args.len);

    let mut polled = 0usize;
    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        match client.transact(Rw::Read, &descriptor, request, None) {
            Ok(reply) => {
                let out = RegisterOutput::from_reply(Rw::Read, &reply);
                print_register(&out, reply.data(), format);
            }
            Err(err) if err.is_dead() => {
                return Err(client_error("connection lost", err));
            }
            Err(err) => {
                warn!(error = %err, "poll failed");
                let out = RegisterOutput::failed(args.link.id, args.cmd, Rw::Read, err.status());
                print_register(&out, &[], format);
            }
        }

        polled = polled.saturating_add(1);
        if args.count.is_some_and(|count| polled >= count) {
            break;
        }
        while running.load(Ordering::SeqCst) && started.elapsed() < interval {
            std::thread::sleep(TICK.min(interval.saturating_sub(started.elapsed())));
        }
    }

    debug!(polled, "watch finished");
    client.close();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
