use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use archbox_outbox::Outbox;
use chrono::SecondsFormat;
use serde::Serialize;
use tracing::info;

use crate::cmd::{install_ctrlc_handler, parse_duration, ProbeArgs};
use crate::exit::{CliResult, PEER_GONE, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct ProbeRecord<'a> {
    address: &'a str,
    peer: &'a str,
    seq: usize,
    alive: bool,
    connected: bool,
    last_verified: String,
}

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let outbox = Outbox::new(args.address.connect()?);
    let address = args.address.to_string();
    info!(%address, peer = outbox.peer(), "probing");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut seq = 0usize;
    while running.load(Ordering::SeqCst) {
        seq += 1;
        let alive = outbox.probe_liveness();
        let record = ProbeRecord {
            address: &address,
            peer: outbox.peer(),
            seq,
            alive,
            connected: outbox.is_connected(),
            last_verified: outbox
                .last_verified()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let rows = [
            ("seq", record.seq.to_string()),
            ("alive", record.alive.to_string()),
            ("connected", record.connected.to_string()),
            ("last_verified", record.last_verified.clone()),
        ];
        print_record(&record, &rows, format);

        if !alive {
            outbox.force_disconnect();
            return Ok(PEER_GONE);
        }
        if args.count.is_some_and(|count| seq >= count) {
            break;
        }
        sleep_while_running(interval, &running);
    }

    outbox.force_disconnect();
    Ok(SUCCESS)
}

fn sleep_while_running(interval: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep((deadline - now).min(Duration::from_millis(50)));
    }
}
