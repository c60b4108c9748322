use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, ListenArgs, Listener};
use crate::exit::{io_error, CliResult, SUCCESS};
use crate::fields::decode_fields;
use crate::output::{print_fields, OutputFormat};

const READ_CHUNK: usize = 64 * 1024;

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let listener = Listener::bind(&args.address)?;
    info!(address = %args.address, "listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    let mut buf = vec![0u8; READ_CHUNK];

    while running.load(Ordering::SeqCst) {
        let mut stream = listener.accept()?;
        let peer = stream.peer_label();
        info!(%peer, "connection accepted");

        while running.load(Ordering::SeqCst) {
            let n = match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_disconnect(&err) => break,
                Err(err) => return Err(io_error("receive failed", err)),
            };

            let frame = Bytes::copy_from_slice(&buf[..n]);
            match decode_fields(&args.layout.0, frame) {
                Ok(fields) => print_fields(&fields, &peer, n, format),
                Err(err) => {
                    warn!(%peer, len = n, %err, "frame does not match layout");
                    continue;
                }
            }
            printed = printed.saturating_add(1);

            if args.count.is_some_and(|count| printed >= count) {
                return Ok(SUCCESS);
            }
        }
        info!(%peer, "connection closed");
    }

    Ok(SUCCESS)
}

fn is_disconnect(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
    )
}
