use std::sync::Mutex;
use std::sync::PoisonError;

use tracing::debug;
use tracing::trace;

use crate::NanoClock;
use crate::Rps;
use crate::ThrottleError;
use crate::Throttler;
use crate::ThrottlingResult;
use crate::TimeSource;
use crate::queue::TimestampQueue;

/// A sliding window throttler safe to share across threads.
///
/// Sampling the clock, inspecting the window and recording the admission all
/// happen inside one critical section, so decisions are totally ordered by
/// lock acquisition. The caller's action runs after the lock is released.
#[derive(Debug)]
pub struct LockingThrottler<C = NanoClock> {
    rps: Rps,
    clock: C,
    window: Mutex<TimestampQueue>,
}

impl LockingThrottler {
    /// Creates a throttler admitting at most `rps` attempts per second, timed by
    /// the shared default clock.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError::InvalidRps`] unless `1 <= rps <= 100000`.
    pub fn new(rps: i64) -> Result<Self, ThrottleError> {
        Ok(Self::with_clock(Rps::new(rps)?, NanoClock::shared()))
    }
}

impl<C: TimeSource> LockingThrottler<C> {
    pub fn with_clock(rps: Rps, clock: C) -> Self {
        debug!(%rps, "creating locking throttler");
        Self {
            rps,
            clock,
            window: Mutex::new(TimestampQueue::new(rps.get() as usize)),
        }
    }

    #[cfg(test)]
    pub(crate) fn admitted(&self) -> Vec<crate::Time> {
        self.window
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }
}

impl<C: TimeSource> Throttler for LockingThrottler<C> {
    fn rps(&self) -> Rps {
        self.rps
    }

    fn try_acquire(&self) -> ThrottlingResult {
        // No user code runs under the lock, so a poisoned guard still holds a
        // consistent window.
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        let passed = window.offer(&self.clock, now);
        drop(window);

        if !passed {
            trace!(now, "window saturated");
        }
        ThrottlingResult::new(passed, now)
    }
}
