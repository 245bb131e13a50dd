use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::NanoClock;
use crate::Rps;
use crate::ThrottleError;
use crate::Throttler;
use crate::ThrottlingResult;
use crate::Time;
use crate::TimeSource;

/// A lock-free sliding window throttler.
///
/// The window is a fixed ring of `rps` atomic timestamps and an atomic cursor
/// counting admissions. Slot `cursor % rps` holds the oldest admission, the
/// one a new attempt has to outlive. Admitting advances the cursor and then
/// overwrites that slot, both through Compare-And-Swap; losing either race
/// restarts the attempt from a fresh clock sample.
///
/// Contention is resolved by retrying, with no backoff or bound on the number
/// of retries. Freed slots reappear every window, so a retrying thread always
/// eventually observes either a rejection or a winnable slot.
#[derive(Debug)]
pub struct RingThrottler<C = NanoClock> {
    rps: Rps,
    clock: C,
    ring: Box<[AtomicI64]>,
    /// Logical admission count, not just an index into `ring`.
    cursor: AtomicU32,
}

/// What one pass through the admission protocol concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Admitted,
    Rejected,
    /// The cursor moved between reading it and reading its slot.
    Inconsistent,
    /// Another thread advanced the cursor first.
    LostCursor,
    /// The cursor was claimed but the slot had already been rewritten.
    LostSlot,
}

impl RingThrottler {
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

impl<C: TimeSource> RingThrottler<C> {
    pub fn with_clock(rps: Rps, clock: C) -> Self {
        debug!(%rps, "creating ring throttler");
        // Older than one window, so the first `rps` attempts always pass.
        let seed = clock.now() - clock.window_length() - 1;
        let ring = (0..rps.get()).map(|_| AtomicI64::new(seed)).collect();
        Self {
            rps,
            clock,
            ring,
            cursor: AtomicU32::new(0),
        }
    }

    /// The cursor value that follows `cursor`.
    ///
    /// At `u32::MAX` the count restarts just past the current slot instead of
    /// wrapping to zero, which keeps `next % rps == (slot + 1) % rps`.
    #[inline]
    fn next_cursor(cursor: u32, slot: u32) -> u32 {
        if cursor < u32::MAX {
            cursor + 1
        } else {
            warn!(cursor, slot, "ring cursor wrapped");
            slot + 1
        }
    }

    /// One pass of the protocol against a clock sample of `now`.
    #[inline]
    fn attempt(&self, now: Time) -> Attempt {
        let cursor = self.cursor.load(Ordering::Acquire);
        let slot = cursor % self.rps.get();
        let oldest = self.ring[slot as usize].load(Ordering::Acquire);

        if cursor != self.cursor.load(Ordering::Acquire) {
            return Attempt::Inconsistent;
        }
        if self.clock.inside_window(oldest, now) {
            return Attempt::Rejected;
        }

        let next = Self::next_cursor(cursor, slot);
        if self
            .cursor
            .compare_exchange(cursor, next, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return Attempt::LostCursor;
        }

        // The cursor stays advanced even if this fails; the slot keeps whatever
        // the winning thread wrote.
        if self.ring[slot as usize]
            .compare_exchange(oldest, now, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return Attempt::LostSlot;
        }
        Attempt::Admitted
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> u32 {
        self.cursor.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn slots(&self) -> Vec<Time> {
        self.ring
            .iter()
            .map(|slot| slot.load(Ordering::Acquire))
            .collect()
    }
}

impl<C: TimeSource> Throttler for RingThrottler<C> {
    fn rps(&self) -> Rps {
        self.rps
    }

    fn try_acquire(&self) -> ThrottlingResult {
        loop {
            let now = self.clock.now();
            match self.attempt(now) {
                Attempt::Admitted => return ThrottlingResult::new(true, now),
                Attempt::Rejected => {
                    trace!(now, "window saturated");
                    return ThrottlingResult::new(false, now);
                }
                retry => trace!(?retry, "retrying admission"),
            }
        }
    }
}
