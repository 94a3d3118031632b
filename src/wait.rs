//! interruptible pause between polling attempts
//!
//! a worker holding a [`WaitCondition`] calls [`WaitCondition::wait`] between
//! attempts at some remote operation (taking a lock, waiting for the store).
//! another thread calls [`WaitCondition::stop`] at shutdown; the worker then
//! stops retrying. stopping is permanent.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

pub struct WaitCondition {
    interval: Option<Duration>,
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl WaitCondition {
    /// waiter that sleeps up to `interval` per wait; a zero interval waits
    /// until stopped
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: (!interval.is_zero()).then_some(interval),
            stopped: Mutex::new(false),
            wake: Condvar::new(),
        }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// waiter whose waits only end when stopped
    pub fn indefinite() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// block until the interval elapses or `stop` is called
    ///
    /// returns true if the caller may retry, false if the waiter was
    /// stopped before or during the wait.
    pub fn wait(&self) -> bool {
        let mut stopped = self.stopped.lock();
        if *stopped {
            return false;
        }

        // an interval too long to put on the clock behaves as no interval
        match self
            .interval
            .and_then(|interval| Instant::now().checked_add(interval))
        {
            Some(deadline) => {
                while !*stopped {
                    if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                        break;
                    }
                }
            }
            None => {
                while !*stopped {
                    self.wake.wait(&mut stopped);
                }
            }
        }

        !*stopped
    }

    /// mark stopped and wake a waiting thread; later calls do nothing more
    pub fn stop(&self) {
        {
            let mut stopped = self.stopped.lock();
            if *stopped {
                return;
            }
            *stopped = true;
        }
        self.wake.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }
}

/// run `attempt` until it yields a value, pausing on `waiter` in between
///
/// errors from `attempt` propagate immediately. `what` describes the
/// operation for logs and for the `Interrupted` error.
pub fn retry<T, F>(waiter: &WaitCondition, what: &'static str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Result<Option<T>>,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        if let Some(value) = attempt()? {
            return Ok(value);
        }
        tracing::debug!(attempts, "still {}", what);
        if !waiter.wait() {
            tracing::info!(attempts, "gave up {}", what);
            return Err(Error::Interrupted(what));
        }
    }
}
