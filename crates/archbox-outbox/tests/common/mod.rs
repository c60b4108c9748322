#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use archbox_outbox::OutboxSocket;
use archbox_transport::{Result, TransportError};
use parking_lot::Mutex;

/// Scripted write result for [`ScriptedSocket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteScript {
    Ok,
    Transient,
    /// Accept this many bytes, then time out.
    Partial(usize),
    Shutdown,
}

#[derive(Debug, Default)]
struct State {
    connected: bool,
    available: VecDeque<usize>,
    readable: bool,
    writes: VecDeque<WriteScript>,
    written: Vec<Vec<u8>>,
    closed: usize,
}

/// In-memory socket whose every answer is set up by the test.
///
/// `available` answers are consumed one per call; the last one sticks.
#[derive(Debug, Clone)]
pub struct ScriptedSocket {
    state: Arc<Mutex<State>>,
    attempts: Arc<AtomicUsize>,
}

impl Default for ScriptedSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSocket {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                connected: true,
                available: VecDeque::from([0]),
                ..State::default()
            })),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
    }

    pub fn script_available(&self, answers: impl IntoIterator<Item = usize>) {
        self.state.lock().available = answers.into_iter().collect();
    }

    pub fn set_readable(&self, readable: bool) {
        self.state.lock().readable = readable;
    }

    pub fn script_writes(&self, results: impl IntoIterator<Item = WriteScript>) {
        self.state.lock().writes.extend(results);
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().written.clone()
    }

    pub fn write_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().closed
    }
}

impl OutboxSocket for ScriptedSocket {
    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn bytes_available(&self) -> Result<usize> {
        let mut state = self.state.lock();
        let answer = if state.available.len() > 1 {
            state.available.pop_front()
        } else {
            state.available.front().copied()
        };
        Ok(answer.unwrap_or(0))
    }

    fn poll_readable(&self, _timeout: Duration) -> Result<bool> {
        Ok(self.state.lock().readable)
    }

    fn write_frame(&self, frame: &[u8]) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        match state.writes.pop_front().unwrap_or(WriteScript::Ok) {
            WriteScript::Ok => {
                state.written.push(frame.to_vec());
                Ok(())
            }
            WriteScript::Transient => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::WouldBlock,
                "scripted transient failure",
            ))),
            WriteScript::Partial(n) => {
                let n = n.min(frame.len());
                state.written.push(frame[..n].to_vec());
                Err(TransportError::PartialWrite {
                    written: n,
                    source: io::Error::new(io::ErrorKind::TimedOut, "scripted stall"),
                })
            }
            WriteScript::Shutdown => Err(TransportError::Shutdown),
        }
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.connected = false;
        state.closed += 1;
        Ok(())
    }

    fn peer_label(&self) -> String {
        "scripted".to_string()
    }
}
