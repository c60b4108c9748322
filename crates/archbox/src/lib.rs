//! Little-endian archive codec and per-connection outbound frame queue.
//!
//! Producers encode values into compact positional frames with
//! [`codec::ArchiveWriter`], hand them to a connection's [`outbox::Outbox`],
//! and a single worker per connection drains the queue with bounded retry.
//!
//! # Crate Structure
//!
//! - [`transport`]: Unix domain socket and TCP streams with liveness primitives
//! - [`codec`]: Archive writer/reader and the `Encode`/`Decode` traits
//! - [`outbox`]: Outbound queue, retry policy, liveness probe and worker guard

/// Re-export transport types.
pub mod transport {
    pub use archbox_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use archbox_codec::*;
}

/// Re-export outbox types.
pub mod outbox {
    pub use archbox_outbox::*;
}
