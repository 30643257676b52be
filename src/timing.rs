//! Debounce and throttle helpers on the tokio clock.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Runs only the last call made within the quiet period.
///
/// Each [`call`](Debouncer::call) cancels the pending one and restarts the
/// timer.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `f` after the quiet period. Must run inside a runtime.
    pub fn call<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        });
        if let Some(previous) = self.pending.lock().replace(task) {
            previous.abort();
        }
    }

    /// Drop the pending call, if any.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(task) if !task.is_finished() => {
                task.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(task) = self.pending.get_mut().take() {
            task.abort();
        }
    }
}

/// Lets at most one call through per interval; the rest are dropped.
pub struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// `true` if a call may pass now; records the pass.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock();
        match *last {
            Some(at) if now.duration_since(at) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Run `f` if the throttle lets it through; returns whether it ran.
    pub fn call<F: FnOnce()>(&self, f: F) -> bool {
        let pass = self.try_acquire();
        if pass {
            f();
        }
        pass
    }

    pub fn reset(&self) {
        *self.last.lock() = None;
    }
}
