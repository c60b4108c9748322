use std::path::PathBuf;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified endpoint.
    #[error("failed to bind to {endpoint}: {source}")]
    Bind {
        endpoint: String,
        source: std::io::Error,
    },

    /// Failed to connect to the specified endpoint.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// A write failed after part of the buffer was already sent.
    #[error("write failed after {written} bytes: {source}")]
    PartialWrite {
        written: usize,
        source: std::io::Error,
    },

    /// The stream handle has been closed or is no longer valid.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// Whether the error means the handle itself is gone, as opposed to a
    /// failed operation on a still-valid handle.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, TransportError::Shutdown)
    }

    /// Bytes of the buffer that reached the socket before the failure.
    pub fn bytes_written(&self) -> usize {
        match self {
            TransportError::PartialWrite { written, .. } => *written,
            _ => 0,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
