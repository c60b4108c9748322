//! Stream socket provider for archbox.
//!
//! Supplies connected stream handles over:
//! - Unix domain sockets (Linux/macOS)
//! - TCP
//!
//! Besides plain `Read`/`Write`, a [`Stream`] exposes the cheap liveness
//! primitives the outbox layer needs: the socket's own connected flag, the
//! number of bytes waiting to be read, and a zero-timeout readability poll.
//! The last two are unix-only; other hosts get an `Unsupported` I/O error,
//! for TCP streams too.

pub mod error;
pub mod stream;
pub mod tcp;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use stream::Stream;
pub use tcp::TcpSocket;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
