use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Something that can report whether the worker it tracks has finished.
///
/// The outbox only uses this to refuse a second concurrent assignment; it
/// never joins or cancels the worker.
pub trait WorkerHandle: Send {
    fn is_finished(&self) -> bool;
}

impl<T: Send> WorkerHandle for std::thread::JoinHandle<T> {
    fn is_finished(&self) -> bool {
        std::thread::JoinHandle::is_finished(self)
    }
}

#[cfg(feature = "async")]
impl<T: Send> WorkerHandle for tokio::task::JoinHandle<T> {
    fn is_finished(&self) -> bool {
        tokio::task::JoinHandle::is_finished(self)
    }
}

/// A completion flag shared between a worker and the outbox guarding it.
///
/// The worker calls [`finish`](WorkerSignal::finish) (or drops its
/// [`WorkerSignal::completer`]) when done.
#[derive(Debug, Clone, Default)]
pub struct WorkerSignal {
    done: Arc<AtomicBool>,
}

impl WorkerSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the worker finished.
    pub fn finish(&self) {
        self.done.store(true, Ordering::Release);
    }

    /// A guard that marks the worker finished when dropped, including on
    /// unwind.
    pub fn completer(&self) -> WorkerCompletion {
        WorkerCompletion {
            signal: self.clone(),
        }
    }
}

impl WorkerHandle for WorkerSignal {
    fn is_finished(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

/// Drop guard returned by [`WorkerSignal::completer`].
#[derive(Debug)]
pub struct WorkerCompletion {
    signal: WorkerSignal,
}

impl Drop for WorkerCompletion {
    fn drop(&mut self) {
        self.signal.finish();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn signal_tracks_completion() {
        let signal = WorkerSignal::new();
        assert!(!signal.is_finished());

        let worker_side = signal.clone();
        worker_side.finish();
        assert!(signal.is_finished());
    }

    #[test]
    fn completer_fires_on_drop() {
        let signal = WorkerSignal::new();
        {
            let _completion = signal.completer();
            assert!(!signal.is_finished());
        }
        assert!(signal.is_finished());
    }

    #[test]
    fn join_handle_reports_finished() {
        let (tx, rx) = mpsc::channel::<()>();
        let handle = std::thread::spawn(move || {
            let _ = rx.recv();
        });
        assert!(!WorkerHandle::is_finished(&handle));

        tx.send(()).unwrap();
        while !WorkerHandle::is_finished(&handle) {
            std::thread::yield_now();
        }
        handle.join().unwrap();
    }
}
