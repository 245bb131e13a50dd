use std::fmt::Debug;
use std::sync::Arc;
use std::sync::LazyLock;

use quanta::Clock;
use quanta::Instant;

/// A point in time, in the units of the [`TimeSource`] that produced it.
///
/// Signed so that a ring can be seeded with values older than the clock's anchor.
pub type Time = i64;

/// Nanoseconds in one second, the window length of [`NanoClock`].
pub const NANOS_PER_SECOND: Time = 1_000_000_000;

static SHARED: LazyLock<NanoClock> = LazyLock::new(NanoClock::new);

/// A monotonic time source with a fixed window length.
pub trait TimeSource: Debug + Send + Sync {
    /// Current time. Never decreases between calls.
    fn now(&self) -> Time;

    /// Length of one window, in the same units as [`TimeSource::now`].
    fn window_length(&self) -> Time;

    /// True iff `first` and `second` are strictly less than one window apart.
    ///
    /// Symmetric in its arguments. A gap of exactly one window is outside.
    fn inside_window(&self, first: Time, second: Time) -> bool {
        first.abs_diff(second) < self.window_length().unsigned_abs()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Time {
        (**self).now()
    }

    fn window_length(&self) -> Time {
        (**self).window_length()
    }

    fn inside_window(&self, first: Time, second: Time) -> bool {
        (**self).inside_window(first, second)
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> Time {
        (**self).now()
    }

    fn window_length(&self) -> Time {
        (**self).window_length()
    }

    fn inside_window(&self, first: Time, second: Time) -> bool {
        (**self).inside_window(first, second)
    }
}

/// Nanosecond time source with a one second window.
///
/// Readings are nanoseconds elapsed since the clock was built, taken from a
/// monotonic `quanta` clock, so wall-clock adjustments are never observed.
/// Clones share the same anchor and produce comparable readings.
#[derive(Debug, Clone)]
pub struct NanoClock {
    clock: Clock,
    /// A fixed point in time to calculate deltas from.
    anchor: Instant,
}

impl NanoClock {
    pub fn new() -> Self {
        Self::with_clock(Clock::new())
    }

    /// Wraps an existing `quanta` clock, e.g. one from `Clock::mock()`.
    pub fn with_clock(clock: Clock) -> Self {
        let anchor = clock.now();
        Self { clock, anchor }
    }

    /// The process-wide default clock.
    ///
    /// Built once on first use. Every throttler constructed without an explicit
    /// time source holds a clone of it, so their readings share one anchor.
    pub fn shared() -> Self {
        SHARED.clone()
    }
}

impl Default for NanoClock {
    fn default() -> Self {
        Self::shared()
    }
}

impl TimeSource for NanoClock {
    #[inline]
    fn now(&self) -> Time {
        self.clock.now().duration_since(self.anchor).as_nanos() as Time
    }

    #[inline]
    fn window_length(&self) -> Time {
        NANOS_PER_SECOND
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn it_is_exclusive_at_the_window_boundary() {
        let clock = NanoClock::new();

        assert!(clock.inside_window(0, NANOS_PER_SECOND - 1));
        assert!(!clock.inside_window(0, NANOS_PER_SECOND));
        assert!(!clock.inside_window(0, NANOS_PER_SECOND + 1));
    }

    #[test]
    fn it_is_symmetric() {
        let clock = NanoClock::new();

        for (a, b) in [(0, 5), (-NANOS_PER_SECOND, 0), (10, 10 + NANOS_PER_SECOND)] {
            assert_eq!(clock.inside_window(a, b), clock.inside_window(b, a));
        }
        assert!(clock.inside_window(7, 7));
    }

    #[test]
    fn it_does_not_overflow_on_extreme_inputs() {
        let clock = NanoClock::new();

        assert!(!clock.inside_window(Time::MIN, Time::MAX));
        assert!(!clock.inside_window(Time::MAX, Time::MIN));
    }

    #[test]
    fn it_never_goes_backwards() {
        let clock = NanoClock::new();

        let mut last = clock.now();
        for _ in 0..10_000 {
            let now = clock.now();
            assert!(now >= last, "clock went from {last} to {now}");
            last = now;
        }
    }

    #[test]
    fn it_follows_a_mock_clock() {
        let (clock, mock) = Clock::mock();
        let clock = NanoClock::with_clock(clock);

        assert_eq!(clock.now(), 0);
        mock.increment(Duration::from_millis(250));
        assert_eq!(clock.now(), 250_000_000);
        assert_eq!(clock.window_length(), NANOS_PER_SECOND);
    }

    #[test]
    fn shared_clones_agree_on_their_anchor() {
        let first = NanoClock::shared();
        let second = NanoClock::default();

        let a = first.now();
        let b = second.now();
        assert!(b >= a);
        assert!(first.inside_window(a, b));
    }

    #[test]
    fn it_works_through_references() {
        let clock = Arc::new(NanoClock::new());
        let by_ref = &clock;

        assert_eq!(by_ref.window_length(), clock.window_length());
        assert!(by_ref.inside_window(1, 2));
    }
}
