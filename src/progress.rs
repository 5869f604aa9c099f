use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Running,
    Completed,
    Cancelled,
}

impl BatchState {
    pub fn is_terminal(self) -> bool {
        self != BatchState::Running
    }
}

/// A point-in-time view of a batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub state: BatchState,
    pub total: u64,
    /// Units that finished, including those whose image was dropped.
    pub completed: u64,
    /// Units that finished without delivering an image to the sink.
    pub failed: u64,
}

type TerminalCallback = Box<dyn FnOnce(BatchReport) + Send>;

struct Lifecycle {
    state: BatchState,
    callbacks: Vec<TerminalCallback>,
}

/// Progress and cancellation scope of one batch, shared between the caller and the workers.
///
/// `completed` only grows and never passes `total`. Once the batch leaves
/// [`BatchState::Running`] it never changes state again, and the terminal notification (waiters
/// plus [`on_terminal`](BatchProgress::on_terminal) callbacks) fires exactly once.
pub struct BatchProgress {
    total: u64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
    terminal: Condvar,
}

impl fmt::Debug for BatchProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.report().fmt(f)
    }
}

impl BatchProgress {
    pub(crate) fn new(total: u64) -> Self {
        BatchProgress {
            total,
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle {
                state: BatchState::Running,
                callbacks: Vec::new(),
            }),
            terminal: Condvar::new(),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn state(&self) -> BatchState {
        self.lock().state
    }

    /// Fraction of units finished, `1.0` for an empty batch.
    pub fn fraction_completed(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed() as f64 / self.total as f64
    }

    pub fn report(&self) -> BatchReport {
        let state = self.state();
        BatchReport {
            state,
            total: self.total,
            completed: self.completed(),
            failed: self.failed(),
        }
    }

    /// Requests cancellation. Units that have not started become no-ops; units in flight finish.
    /// Returns `false` (and does nothing) if the batch is already terminal.
    pub fn cancel(&self) -> bool {
        let lifecycle = self.lock();
        if lifecycle.state.is_terminal() {
            return false;
        }
        self.cancelled.store(true, Ordering::Release);
        true
    }

    /// Blocks until the batch is terminal.
    pub fn wait(&self) -> BatchReport {
        let mut lifecycle = self.lock();
        while !lifecycle.state.is_terminal() {
            lifecycle = self
                .terminal
                .wait(lifecycle)
                .unwrap_or_else(|e| e.into_inner());
        }
        drop(lifecycle);
        self.report()
    }

    /// Like [`wait`](BatchProgress::wait), giving up after `timeout`. Does not cancel.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<BatchReport> {
        let deadline = Instant::now() + timeout;
        let mut lifecycle = self.lock();
        while !lifecycle.state.is_terminal() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            lifecycle = self
                .terminal
                .wait_timeout(lifecycle, remaining)
                .unwrap_or_else(|e| e.into_inner())
                .0;
        }
        drop(lifecycle);
        Some(self.report())
    }

    /// Registers `callback` for the terminal notification. If the batch is already terminal the
    /// callback runs right away on the calling thread.
    pub fn on_terminal<F>(&self, callback: F)
    where
        F: FnOnce(BatchReport) + Send + 'static,
    {
        let mut lifecycle = self.lock();
        if !lifecycle.state.is_terminal() {
            lifecycle.callbacks.push(Box::new(callback));
            return;
        }
        drop(lifecycle);
        callback(self.report());
    }

    /// Counts one finished unit.
    pub(crate) fn record_unit(&self, delivered: bool) {
        if !delivered {
            self.failed.fetch_add(1, Ordering::AcqRel);
        }
        let prev = self.completed.fetch_add(1, Ordering::AcqRel);
        debug_assert!(prev < self.total, "more units completed than dispatched");
    }

    /// Moves the batch to its terminal state once no unit remains pending. Only the first call
    /// has any effect; it returns the final report.
    ///
    /// Waiters are released before the terminal callbacks run, so a callback may itself call
    /// [`wait`](BatchProgress::wait).
    pub(crate) fn finish(&self) -> Option<BatchReport> {
        let mut lifecycle = self.lock();
        if lifecycle.state.is_terminal() {
            return None;
        }
        let completed = self.completed();
        lifecycle.state = if completed < self.total && self.is_cancelled() {
            BatchState::Cancelled
        } else {
            BatchState::Completed
        };
        let report = BatchReport {
            state: lifecycle.state,
            total: self.total,
            completed,
            failed: self.failed(),
        };
        let callbacks = std::mem::take(&mut lifecycle.callbacks);
        drop(lifecycle);
        self.terminal.notify_all();

        for callback in callbacks {
            callback(report);
        }
        Some(report)
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_counts_and_completion() {
        let progress = BatchProgress::new(3);
        assert_eq!(progress.state(), BatchState::Running);
        progress.record_unit(true);
        progress.record_unit(false);
        progress.record_unit(true);
        assert_eq!(progress.fraction_completed(), 1.0);

        let report = progress.finish().unwrap();
        assert_eq!(
            report,
            BatchReport {
                state: BatchState::Completed,
                total: 3,
                completed: 3,
                failed: 1
            }
        );
        assert_eq!(progress.finish(), None);
        assert_eq!(progress.wait(), report);
    }

    #[test]
    fn test_cancel_is_sticky_and_ignored_after_terminal() {
        let progress = BatchProgress::new(10);
        progress.record_unit(true);
        assert!(progress.cancel());
        assert!(progress.is_cancelled());
        assert_eq!(progress.finish().unwrap().state, BatchState::Cancelled);
        assert_eq!(progress.completed(), 1);
        assert!(!progress.cancel());
        assert_eq!(progress.state(), BatchState::Cancelled);
    }

    #[test]
    fn test_cancel_after_last_unit_still_completes() {
        let progress = BatchProgress::new(1);
        progress.record_unit(true);
        progress.cancel();
        assert_eq!(progress.finish().unwrap().state, BatchState::Completed);
    }

    #[test]
    fn test_terminal_callbacks_fire_once() {
        let progress = BatchProgress::new(0);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        progress.on_terminal(move |report| {
            assert_eq!(report.state, BatchState::Completed);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        progress.finish();
        progress.finish();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Late subscribers hear about it immediately.
        let counter = fired.clone();
        progress.on_terminal(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_callback_may_wait_on_its_own_batch() {
        let progress = Arc::new(BatchProgress::new(1));
        let seen = Arc::new(Mutex::new(None));
        {
            let progress2 = progress.clone();
            let seen = seen.clone();
            progress.on_terminal(move |_| {
                *seen.lock().unwrap() = Some(progress2.wait());
            });
        }
        let worker = {
            let progress = progress.clone();
            std::thread::spawn(move || {
                progress.record_unit(true);
                progress.finish();
            })
        };
        worker.join().unwrap();
        assert_eq!(seen.lock().unwrap().unwrap().state, BatchState::Completed);
    }

    #[test]
    fn test_wait_timeout() {
        let progress = Arc::new(BatchProgress::new(1));
        assert_eq!(progress.wait_timeout(Duration::from_millis(10)), None);

        let worker = {
            let progress = progress.clone();
            std::thread::spawn(move || {
                progress.record_unit(true);
                progress.finish();
            })
        };
        let report = progress.wait_timeout(Duration::from_secs(30)).unwrap();
        assert_eq!(report.completed, 1);
        worker.join().unwrap();
    }
}
