use std::collections::VecDeque;

use crate::Time;
use crate::TimeSource;

/// Timestamps of the most recent admissions, oldest first.
///
/// Holds at most `capacity` entries. Allocated up front, so admitting never
/// grows the buffer.
#[derive(Debug)]
pub(crate) struct TimestampQueue {
    times: VecDeque<Time>,
    capacity: usize,
}

impl TimestampQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            times: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records `now` if the window has room for it.
    ///
    /// When full, the oldest entry is evicted only if it has aged out of the
    /// window relative to `now`. A rejected offer changes nothing.
    #[inline]
    pub(crate) fn offer<C: TimeSource>(&mut self, clock: &C, now: Time) -> bool {
        if self.times.len() < self.capacity {
            self.times.push_back(now);
            return true;
        }
        match self.times.front() {
            Some(&oldest) if clock.inside_window(oldest, now) => false,
            _ => {
                self.times.pop_front();
                self.times.push_back(now);
                true
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.times.len()
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> Vec<Time> {
        self.times.iter().copied().collect()
    }
}
