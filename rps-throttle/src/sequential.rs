use std::cell::RefCell;

use tracing::debug;
use tracing::trace;

use crate::NanoClock;
use crate::Rps;
use crate::ThrottleError;
use crate::Throttler;
use crate::ThrottlingResult;
use crate::TimeSource;
use crate::queue::TimestampQueue;

/// The reference sliding window throttler.
///
/// Keeps the timestamps of the last `rps` admissions and admits a new attempt
/// only if the oldest of them has left the window. There is no synchronization:
/// the window lives in a `RefCell`, so the type is `!Sync` and the compiler keeps
/// it on one thread.
#[derive(Debug)]
pub struct SequentialThrottler<C = NanoClock> {
    rps: Rps,
    clock: C,
    window: RefCell<TimestampQueue>,
}

impl SequentialThrottler {
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

impl<C: TimeSource> SequentialThrottler<C> {
    pub fn with_clock(rps: Rps, clock: C) -> Self {
        debug!(%rps, "creating sequential throttler");
        Self {
            rps,
            clock,
            window: RefCell::new(TimestampQueue::new(rps.get() as usize)),
        }
    }

    #[cfg(test)]
    pub(crate) fn admitted(&self) -> Vec<crate::Time> {
        self.window.borrow().snapshot()
    }
}

impl<C: TimeSource> Throttler for SequentialThrottler<C> {
    fn rps(&self) -> Rps {
        self.rps
    }

    fn try_acquire(&self) -> ThrottlingResult {
        let now = self.clock.now();
        // The borrow ends here, before any action runs, so an action may call
        // back into this throttler.
        let passed = self.window.borrow_mut().offer(&self.clock, now);
        if !passed {
            trace!(now, "window saturated");
        }
        ThrottlingResult::new(passed, now)
    }
}
