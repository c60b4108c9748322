//! Per-connection outbound frame queue.
//!
//! An [`Outbox`] owns one connected stream socket and a FIFO of encoded
//! frames. A single worker drains it one frame at a time; write failures are
//! retried a bounded number of times before the frame is abandoned, and a
//! non-destructive liveness probe tells a reaper whether the peer is gone.
//!
//! Delivery is best effort: frames are dropped, without notice to the
//! producer, when the connection is found disconnected or a frame exhausts
//! its retries. A frame that stalls after part of it went out is resumed
//! from where it stopped; if it cannot be finished the connection closes.
//!
//! The liveness probe, and so [`OutboxPool::reap`], relies on byte-count and
//! poll primitives that only unix hosts provide. Elsewhere the probe fails
//! and every peer reads as gone.

pub mod config;
pub mod error;
pub mod outbox;
pub mod pool;
pub mod socket;
pub mod worker;

pub use config::{OutboxConfig, TextEncoding, DEFAULT_MAX_SEND_ATTEMPTS};
pub use error::{OutboxError, Result};
pub use outbox::{DrainOutcome, Outbox, OutboxState};
pub use pool::{ConnectionId, OutboxPool};
pub use socket::OutboxSocket;
pub use worker::{WorkerCompletion, WorkerHandle, WorkerSignal};
