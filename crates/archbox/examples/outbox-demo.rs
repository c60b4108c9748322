//! Encode a few entities, queue them on a Unix socket outbox, and decode them
//! on the other side.
//!
//! Run with:
//!   cargo run --example outbox-demo

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::io::Read;
    use std::sync::Arc;

    use archbox::codec::{
        decode_from_frame, encode_to_frame, ArchiveReader, ArchiveWriter, Decode, Encode,
        Timestamp, Uuid,
    };
    use archbox::outbox::Outbox;
    use archbox::transport::UnixDomainSocket;

    #[derive(Debug)]
    struct Heartbeat {
        node: Uuid,
        seq: i32,
        sent_at: Timestamp,
        note: String,
    }

    impl Encode for Heartbeat {
        fn encode(&self, writer: &mut ArchiveWriter) -> archbox::codec::Result<()> {
            writer.write_guid(&self.node);
            writer.write_int(self.seq);
            writer.write_timestamp(self.sent_at);
            writer.write_string(&self.note)
        }
    }

    impl Decode for Heartbeat {
        fn decode(reader: &mut ArchiveReader) -> archbox::codec::Result<Self> {
            Ok(Self {
                node: reader.read_guid()?,
                seq: reader.read_int()?,
                sent_at: reader.read_timestamp()?,
                note: reader.read_string()?,
            })
        }
    }

    let dir = std::env::temp_dir().join(format!("archbox-demo-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let listener = UnixDomainSocket::bind(dir.join("demo.sock"))?;

    let client = UnixDomainSocket::connect(listener.path())?;
    let mut server = listener.accept()?;

    let outbox = Arc::new(Outbox::new(client));
    let node = Uuid::from_u128(0x0011_2233_4455_6677_8899_aabb_ccdd_eeff);
    let mut frame_len = 0;
    for seq in 1..=3 {
        let frame = encode_to_frame(&Heartbeat {
            node,
            seq,
            sent_at: Timestamp::now(),
            note: format!("beat {seq}"),
        })?;
        frame_len = frame.len();
        outbox.enqueue(frame)?;
    }

    outbox.spawn_worker()?;

    // Every heartbeat encodes to the same length, so fixed-size reads split them.
    let mut buf = vec![0u8; frame_len];
    for _ in 0..3 {
        server.read_exact(&mut buf)?;
        let beat: Heartbeat = decode_from_frame(buf.clone())?;
        eprintln!("received {beat:?}");
    }

    eprintln!("peer alive: {}", outbox.probe_liveness());
    outbox.force_disconnect();
    let _ = std::fs::remove_dir_all(&dir);
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("outbox-demo needs Unix domain sockets");
}
