/// Errors that can occur in outbox operations.
#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    /// The outbox has been closed; no further frames are accepted.
    #[error("connection closed")]
    ConnectionClosed,

    /// A worker is already assigned and still running.
    #[error("a worker is already active for this connection")]
    WorkerAlreadyActive,

    /// The worker thread could not be started.
    #[error("failed to spawn worker: {0}")]
    Spawn(std::io::Error),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] archbox_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, OutboxError>;
