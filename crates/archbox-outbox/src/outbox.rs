use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use archbox_transport::{Stream, TransportError};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::config::{OutboxConfig, TextEncoding};
use crate::error::{OutboxError, Result};
use crate::socket::OutboxSocket;
use crate::worker::WorkerHandle;

/// Lifecycle state of an outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxState {
    /// Socket usable; frames may be queued.
    Open,
    /// A drain currently holds the socket.
    Draining,
    /// Socket released. Terminal.
    Closed,
}

/// What a single [`Outbox::drain_once`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Queue was empty; no I/O performed.
    Idle,
    /// Head frame written and removed.
    Sent { more: bool },
    /// Head frame failed to write and stays at the head.
    Retrying { attempts: u32, more: bool },
    /// Head frame failed its last allowed attempt and was dropped.
    Abandoned { more: bool },
    /// Socket reported disconnected; the whole queue was dropped.
    Disconnected { dropped: usize },
    /// The outbox is closed, either already or as a result of this call.
    Closed,
}

impl DrainOutcome {
    /// Whether the caller should call again.
    pub fn has_more(self) -> bool {
        match self {
            DrainOutcome::Sent { more }
            | DrainOutcome::Retrying { more, .. }
            | DrainOutcome::Abandoned { more } => more,
            DrainOutcome::Idle | DrainOutcome::Disconnected { .. } | DrainOutcome::Closed => false,
        }
    }
}

/// Retry bookkeeping; its mutex is the scope every socket write and
/// teardown runs under.
struct Link {
    attempts: u32,
    /// Bytes of the head frame already on the wire.
    offset: usize,
}

impl Link {
    fn reset(&mut self) {
        self.attempts = 0;
        self.offset = 0;
    }
}

#[derive(Default)]
struct Pending {
    frames: VecDeque<Bytes>,
    closed: bool,
}

/// Outbound frame queue for one stream connection.
///
/// Producers call [`enqueue`](Outbox::enqueue) from any thread. One worker
/// at a time calls [`drain_one`](Outbox::drain_one) until it returns `false`.
pub struct Outbox<S: OutboxSocket = Stream> {
    link: Mutex<Link>,
    socket: RwLock<Option<S>>,
    pending: Mutex<Pending>,
    draining: AtomicBool,
    last_verified: Mutex<DateTime<Utc>>,
    encoding: Mutex<TextEncoding>,
    worker: Mutex<Option<Box<dyn WorkerHandle>>>,
    peer: String,
    config: OutboxConfig,
}

impl<S: OutboxSocket> Outbox<S> {
    /// Take ownership of a connected socket with default configuration.
    pub fn new(socket: S) -> Self {
        Self::with_config(socket, OutboxConfig::default())
    }

    /// Take ownership of a connected socket with explicit configuration.
    pub fn with_config(socket: S, config: OutboxConfig) -> Self {
        let peer = socket.peer_label();
        debug!(%peer, encoding = %config.encoding, "outbox opened");
        Self {
            link: Mutex::new(Link {
                attempts: 0,
                offset: 0,
            }),
            socket: RwLock::new(Some(socket)),
            pending: Mutex::new(Pending::default()),
            draining: AtomicBool::new(false),
            last_verified: Mutex::new(Utc::now()),
            encoding: Mutex::new(config.encoding),
            worker: Mutex::new(None),
            peer,
            config,
        }
    }

    /// Append a frame to the tail of the queue.
    pub fn enqueue(&self, frame: impl Into<Bytes>) -> Result<()> {
        let mut pending = self.pending.lock();
        if pending.closed {
            return Err(OutboxError::ConnectionClosed);
        }
        pending.frames.push_back(frame.into());
        Ok(())
    }

    /// The socket's own connected flag. Never fails.
    pub fn is_connected(&self) -> bool {
        self.socket
            .read()
            .as_ref()
            .is_some_and(|socket| socket.is_connected())
    }

    /// Check, without consuming data, whether the peer is still there.
    ///
    /// Looks at the bytes waiting first; if there are none, polls for
    /// readability with the configured timeout. Readable with nothing to
    /// read means the peer hung up. The byte count is read again after the
    /// poll so that data landing between the two checks is not mistaken for
    /// a hang-up. Records the check time whatever the result.
    pub fn probe_liveness(&self) -> bool {
        let alive = match self.socket.read().as_ref() {
            Some(socket) => match probe(socket, self.config.probe_timeout) {
                Ok(alive) => alive,
                Err(err) => {
                    debug!(peer = %self.peer, %err, "liveness probe failed");
                    false
                }
            },
            None => false,
        };
        *self.last_verified.lock() = Utc::now();
        if !alive {
            debug!(peer = %self.peer, "peer appears disconnected");
        }
        alive
    }

    /// Try to write the head-of-queue frame once.
    ///
    /// Returns whether more work is queued. See [`drain_once`](Outbox::drain_once)
    /// for the detailed outcome.
    pub fn drain_one(&self, max_attempts: u32) -> bool {
        self.drain_once(max_attempts).has_more()
    }

    /// Try to write the head-of-queue frame once and report what happened.
    ///
    /// A `max_attempts` of zero is treated as one.
    pub fn drain_once(&self, max_attempts: u32) -> DrainOutcome {
        let mut link = self.link.lock();
        let _draining = DrainingFlag::raise(&self.draining);

        let socket_guard = self.socket.read();
        let Some(socket) = socket_guard.as_ref() else {
            return DrainOutcome::Closed;
        };

        if !socket.is_connected() {
            let dropped = {
                let mut pending = self.pending.lock();
                let dropped = pending.frames.len();
                pending.frames.clear();
                dropped
            };
            link.reset();
            if dropped > 0 {
                warn!(peer = %self.peer, dropped, "socket disconnected; dropping queued frames");
            }
            return DrainOutcome::Disconnected { dropped };
        }

        // Only this scope removes the head, so it stays put while we write.
        let Some(head) = self.pending.lock().frames.front().cloned() else {
            return DrainOutcome::Idle;
        };

        match socket.write_frame(&head[link.offset..]) {
            Ok(()) => {
                link.reset();
                let more = {
                    let mut pending = self.pending.lock();
                    pending.frames.pop_front();
                    !pending.frames.is_empty()
                };
                trace!(peer = %self.peer, len = head.len(), more, "frame sent");
                DrainOutcome::Sent { more }
            }
            Err(TransportError::Shutdown) => {
                drop(socket_guard);
                warn!(peer = %self.peer, "socket handle invalid mid-write; closing");
                self.close_locked(&mut link);
                DrainOutcome::Closed
            }
            Err(err) => {
                link.offset += err.bytes_written();
                link.attempts += 1;
                let attempts = link.attempts;
                if attempts >= max_attempts.max(1) && link.offset > 0 {
                    // The peer holds a prefix of the head frame; skipping the
                    // rest would misalign every frame after it.
                    drop(socket_guard);
                    warn!(
                        peer = %self.peer,
                        attempts,
                        sent = link.offset,
                        len = head.len(),
                        %err,
                        "frame stalled part-way through; closing"
                    );
                    self.close_locked(&mut link);
                    return DrainOutcome::Closed;
                }
                let mut pending = self.pending.lock();
                if attempts >= max_attempts.max(1) {
                    pending.frames.pop_front();
                    link.reset();
                    warn!(
                        peer = %self.peer,
                        attempts,
                        len = head.len(),
                        %err,
                        "abandoning frame after repeated write failures"
                    );
                    DrainOutcome::Abandoned {
                        more: !pending.frames.is_empty(),
                    }
                } else {
                    debug!(
                        peer = %self.peer,
                        attempts,
                        sent = link.offset,
                        %err,
                        "frame write failed; will retry"
                    );
                    DrainOutcome::Retrying {
                        attempts,
                        more: !pending.frames.is_empty(),
                    }
                }
            }
        }
    }

    /// Whether a worker should be scheduled for this connection: frames are
    /// queued, or unread input is waiting and no worker is running.
    pub fn has_more_work(&self) -> bool {
        if !self.pending.lock().frames.is_empty() {
            return true;
        }
        let readable = self
            .socket
            .read()
            .as_ref()
            .and_then(|socket| socket.bytes_available().ok())
            .is_some_and(|available| available > 0);
        readable && self.can_assign_worker()
    }

    /// Close the socket. Waits for an in-flight write; idempotent.
    pub fn force_disconnect(&self) {
        let mut link = self.link.lock();
        self.close_locked(&mut link);
    }

    /// Record `handle` as this connection's worker.
    ///
    /// Fails with [`OutboxError::WorkerAlreadyActive`] while the previously
    /// assigned worker is still running.
    pub fn assign_worker(&self, handle: impl WorkerHandle + 'static) -> Result<()> {
        let mut slot = self.worker.lock();
        if slot.as_ref().is_some_and(|current| !current.is_finished()) {
            return Err(OutboxError::WorkerAlreadyActive);
        }
        *slot = Some(Box::new(handle));
        Ok(())
    }

    /// Whether a new worker may be assigned right now.
    pub fn can_assign_worker(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_none_or(|current| current.is_finished())
    }

    /// Detach and return the current worker handle, if any.
    pub fn release_worker(&self) -> Option<Box<dyn WorkerHandle>> {
        self.worker.lock().take()
    }

    pub fn state(&self) -> OutboxState {
        if self.pending.lock().closed {
            OutboxState::Closed
        } else if self.draining.load(Ordering::Acquire) {
            OutboxState::Draining
        } else {
            OutboxState::Open
        }
    }

    /// Frames waiting to be written.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().frames.len()
    }

    /// Failed attempts on the current head frame.
    pub fn attempts(&self) -> u32 {
        self.link.lock().attempts
    }

    /// When [`probe_liveness`](Outbox::probe_liveness) last ran (or when the
    /// outbox was created).
    pub fn last_verified(&self) -> DateTime<Utc> {
        *self.last_verified.lock()
    }

    pub fn encoding(&self) -> TextEncoding {
        *self.encoding.lock()
    }

    pub fn set_encoding(&self, encoding: TextEncoding) {
        *self.encoding.lock() = encoding;
    }

    /// Remote endpoint label captured when the outbox was opened.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn config(&self) -> &OutboxConfig {
        &self.config
    }

    fn close_locked(&self, link: &mut Link) {
        link.reset();
        let dropped = {
            let mut pending = self.pending.lock();
            pending.closed = true;
            let dropped = pending.frames.len();
            pending.frames.clear();
            dropped
        };
        if let Some(socket) = self.socket.write().take() {
            if let Err(err) = socket.close() {
                debug!(peer = %self.peer, %err, "error while closing socket");
            }
            debug!(peer = %self.peer, dropped, "outbox closed");
        }
    }
}

impl<S: OutboxSocket + 'static> Outbox<S> {
    /// Start a thread that drains this outbox until it runs out of work.
    ///
    /// The thread is assigned as the connection's worker before it starts,
    /// so a concurrent call fails with [`OutboxError::WorkerAlreadyActive`].
    pub fn spawn_worker(self: &Arc<Self>) -> Result<()> {
        let mut slot = self.worker.lock();
        if slot.as_ref().is_some_and(|current| !current.is_finished()) {
            return Err(OutboxError::WorkerAlreadyActive);
        }

        let outbox = Arc::clone(self);
        let handle = std::thread::Builder::new()
            .name("archbox-outbox".to_string())
            .spawn(move || outbox.run_worker())
            .map_err(OutboxError::Spawn)?;
        *slot = Some(Box::new(handle));
        Ok(())
    }

    fn run_worker(&self) {
        let max_attempts = self.config.max_send_attempts;
        let mut sent = 0usize;
        loop {
            let outcome = self.drain_once(max_attempts);
            match outcome {
                DrainOutcome::Sent { .. } => sent += 1,
                DrainOutcome::Retrying { .. } => std::thread::sleep(self.config.retry_backoff),
                _ => {}
            }
            if !outcome.has_more() {
                trace!(peer = %self.peer, sent, ?outcome, "worker finished");
                return;
            }
        }
    }
}

impl<S: OutboxSocket> Drop for Outbox<S> {
    fn drop(&mut self) {
        if let Some(socket) = self.socket.get_mut().take() {
            if let Err(err) = socket.close() {
                debug!(peer = %self.peer, %err, "error while closing socket on drop");
            }
        }
    }
}

impl<S: OutboxSocket> std::fmt::Debug for Outbox<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("peer", &self.peer)
            .field("state", &self.state())
            .field("pending", &self.pending_len())
            .finish()
    }
}

fn probe<S: OutboxSocket>(
    socket: &S,
    timeout: std::time::Duration,
) -> archbox_transport::Result<bool> {
    if socket.bytes_available()? != 0 {
        return Ok(true);
    }
    if !socket.poll_readable(timeout)? {
        return Ok(true);
    }
    Ok(socket.bytes_available()? != 0)
}

struct DrainingFlag<'a>(&'a AtomicBool);

impl<'a> DrainingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for DrainingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
