use std::sync::mpsc;
use std::sync::Arc;

use archbox_outbox::{DrainOutcome, Outbox, OutboxConfig, OutboxSocket, WorkerSignal};
use serde::Serialize;
use tracing::{debug, info};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{
    field_error, io_error, outbox_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT, USAGE,
};
use crate::fields::encode_fields;
use crate::output::{print_record, OutputFormat};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
struct Tally {
    sent: usize,
    abandoned: usize,
    dropped: usize,
    closed: bool,
}

#[derive(Serialize)]
struct SendReport<'a> {
    address: String,
    peer: &'a str,
    encoding: &'static str,
    queued: usize,
    #[serde(flatten)]
    tally: Tally,
}

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    if args.repeat == 0 {
        return Err(CliError::new(USAGE, "--repeat must be at least 1"));
    }
    let timeout = parse_duration(&args.timeout)?;
    let frame = encode_fields(&args.fields).map_err(|err| field_error("encode failed", err))?;

    let stream = args.address.connect()?;
    let config = OutboxConfig {
        max_send_attempts: args.max_attempts,
        encoding: args.encoding,
        ..OutboxConfig::default()
    };
    let outbox = Arc::new(Outbox::with_config(stream, config));
    info!(address = %args.address, peer = outbox.peer(), "connected");

    for _ in 0..args.repeat {
        outbox
            .enqueue(frame.clone())
            .map_err(|err| outbox_error("enqueue failed", err))?;
    }

    let signal = WorkerSignal::new();
    outbox
        .assign_worker(signal.clone())
        .map_err(|err| outbox_error("worker assignment failed", err))?;

    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(&outbox);
    let completion = signal.completer();
    std::thread::Builder::new()
        .name("archbox-send".to_string())
        .spawn(move || {
            let _completion = completion;
            let _ = tx.send(drain_all(&worker));
        })
        .map_err(|err| io_error("failed to start worker", err))?;

    let tally = rx.recv_timeout(timeout).map_err(|_| {
        CliError::new(
            TIMEOUT,
            format!(
                "queue not drained within {timeout:?} ({} frames pending)",
                outbox.pending_len()
            ),
        )
    })?;
    outbox.force_disconnect();

    let report = SendReport {
        address: args.address.to_string(),
        peer: outbox.peer(),
        encoding: outbox.encoding().label(),
        queued: args.repeat,
        tally,
    };
    print_record(&report, &report_rows(&report), format);

    if tally.sent == args.repeat {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}

/// Drain until the outbox reports no more work, pausing after failed writes.
fn drain_all<S: OutboxSocket>(outbox: &Outbox<S>) -> Tally {
    let max_attempts = outbox.config().max_send_attempts;
    let backoff = outbox.config().retry_backoff;
    let mut tally = Tally::default();
    loop {
        let outcome = outbox.drain_once(max_attempts);
        match outcome {
            DrainOutcome::Sent { .. } => tally.sent += 1,
            DrainOutcome::Abandoned { .. } => tally.abandoned += 1,
            DrainOutcome::Retrying { attempts, .. } => {
                debug!(attempts, "write failed; backing off");
                std::thread::sleep(backoff);
            }
            DrainOutcome::Disconnected { dropped } => tally.dropped += dropped,
            DrainOutcome::Closed => {
                tally.closed = true;
                tally.dropped += outbox.pending_len();
            }
            DrainOutcome::Idle => {}
        }
        if !outcome.has_more() {
            return tally;
        }
    }
}

fn report_rows(report: &SendReport<'_>) -> Vec<(&'static str, String)> {
    vec![
        ("address", report.address.clone()),
        ("peer", report.peer.to_string()),
        ("encoding", report.encoding.to_string()),
        ("queued", report.queued.to_string()),
        ("sent", report.tally.sent.to_string()),
        ("abandoned", report.tally.abandoned.to_string()),
        ("dropped", report.tally.dropped.to_string()),
    ]
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::Read;
    use std::os::unix::net::UnixStream;

    use archbox_transport::Stream;
    use bytes::Bytes;

    use super::*;

    #[test]
    fn drain_all_counts_sent_frames() {
        let (local, mut remote) = UnixStream::pair().unwrap();
        let outbox = Outbox::new(Stream::from(local));
        for _ in 0..3 {
            outbox.enqueue(Bytes::from_static(b"xy")).unwrap();
        }

        let tally = drain_all(&outbox);
        assert_eq!(
            tally,
            Tally {
                sent: 3,
                ..Tally::default()
            }
        );

        let mut buf = [0u8; 6];
        remote.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"xyxyxy");
    }

    #[test]
    fn drain_all_reports_closed_outbox() {
        let (local, _remote) = UnixStream::pair().unwrap();
        let outbox = Outbox::new(Stream::from(local));
        outbox.force_disconnect();

        let tally = drain_all(&outbox);
        assert!(tally.closed);
        assert_eq!(tally.sent, 0);
    }
}
