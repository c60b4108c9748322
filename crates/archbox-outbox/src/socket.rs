use std::time::Duration;

use archbox_transport::{Result, Stream};

/// The socket operations an [`Outbox`](crate::Outbox) relies on.
///
/// All methods take `&self` so liveness queries can run while a write is in
/// flight. Write failures are classified by the returned error:
/// [`TransportError::Shutdown`](archbox_transport::TransportError::Shutdown)
/// means the handle is gone and the connection must close; anything else is
/// treated as transient and retried.
pub trait OutboxSocket: Send + Sync {
    /// The socket's own connected flag. Must not perform I/O.
    fn is_connected(&self) -> bool;

    /// Bytes that can be read without blocking.
    fn bytes_available(&self) -> Result<usize>;

    /// Wait up to `timeout` for the socket to become readable.
    fn poll_readable(&self, timeout: Duration) -> Result<bool>;

    /// Write one complete frame.
    ///
    /// A failure after part of the frame went out should be reported as
    /// [`TransportError::PartialWrite`](archbox_transport::TransportError::PartialWrite);
    /// the next call then passes only the unsent rest.
    fn write_frame(&self, frame: &[u8]) -> Result<()>;

    /// Release the connection. Must be idempotent.
    fn close(&self) -> Result<()>;

    /// Remote endpoint description for logs.
    fn peer_label(&self) -> String {
        "unknown".to_string()
    }
}

impl OutboxSocket for Stream {
    fn is_connected(&self) -> bool {
        Stream::is_connected(self)
    }

    fn bytes_available(&self) -> Result<usize> {
        Stream::bytes_available(self)
    }

    fn poll_readable(&self, timeout: Duration) -> Result<bool> {
        Stream::poll_readable(self, timeout)
    }

    fn write_frame(&self, frame: &[u8]) -> Result<()> {
        self.write_all_shared(frame)
    }

    fn close(&self) -> Result<()> {
        self.shutdown()
    }

    fn peer_label(&self) -> String {
        Stream::peer_label(self)
    }
}
