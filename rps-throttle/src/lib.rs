//! # rps-throttle
//!
//! `rps-throttle` admits or rejects units of work so that no trailing one-second
//! window ever admits more than a fixed requests-per-second budget.
//!
//! ## Core Philosophy
//!
//! This is an exact trailing-window counter, not an amortized rate: every admission
//! is remembered by its timestamp until it ages out of the window. Three throttlers
//! implement the same contract with different concurrency strategies:
//!
//! * [`SequentialThrottler`]: the reference algorithm. No synchronization; the type is
//!   `!Sync`, so it cannot be shared across threads.
//! * [`LockingThrottler`]: the same algorithm with the decision inside a `Mutex`. The
//!   caller's action always runs after the lock is released.
//! * [`RingThrottler`]: a fixed ring of atomic timestamps and an atomic cursor, updated
//!   with Compare-And-Swap (CAS) loops. No `Mutex` in the hot path.
//!
//! ## Example
//!
//! ```rust
//! use rps_throttle::RingThrottler;
//! use rps_throttle::Throttler;
//!
//! let throttler = RingThrottler::new(100).unwrap();
//!
//! if throttler.try_throttle(|| println!("request allowed")) {
//!     // Action ran
//! }
//! ```

use std::fmt;
use std::fmt::Debug;

mod clock;
mod error;
mod locking;
mod queue;
mod ring;
mod sequential;


pub use clock::NANOS_PER_SECOND;
pub use clock::NanoClock;
pub use clock::Time;
pub use clock::TimeSource;
pub use error::ThrottleError;
pub use locking::LockingThrottler;
pub use ring::RingThrottler;
pub use sequential::SequentialThrottler;

/// A validated requests-per-second budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rps(u32);

impl Rps {
    /// Smallest accepted budget.
    pub const MIN: u32 = 1;
    /// Largest accepted budget.
    pub const MAX: u32 = 100_000;

    /// Validates `value` against `[Rps::MIN, Rps::MAX]`.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError::InvalidRps`] if `value` is out of range.
    pub fn new(value: i64) -> Result<Self, ThrottleError> {
        if value < i64::from(Self::MIN) || value > i64::from(Self::MAX) {
            return Err(ThrottleError::InvalidRps(value));
        }
        Ok(Self(value as u32))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for Rps {
    type Error = ThrottleError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Rps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rps", self.0)
    }
}

/// Outcome of a single throttling attempt.
///
/// `time` is the sample taken for the decision, whether or not the attempt passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlingResult {
    passed: bool,
    time: Time,
}

impl ThrottlingResult {
    pub fn new(passed: bool, time: Time) -> Self {
        Self { passed, time }
    }

    /// Whether the attempt was admitted.
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// The timestamp sampled for the attempt, in the throttler's clock units.
    pub fn time(&self) -> Time {
        self.time
    }
}

impl fmt::Display for ThrottlingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.passed { "passed" } else { "rejected" };
        write!(f, "{outcome} at {}", self.time)
    }
}

/// The contract shared by every throttler.
///
/// Implementations keep their own window state; nothing is shared between
/// instances except, optionally, the [`TimeSource`] they were built with.
pub trait Throttler: Debug {
    /// The budget this throttler enforces.
    fn rps(&self) -> Rps;

    /// Decides whether one unit of work may proceed now, without running anything.
    ///
    /// An admitted attempt consumes a slot of the budget. A rejected attempt
    /// leaves the window state untouched.
    fn try_acquire(&self) -> ThrottlingResult;

    /// Runs `action` if the attempt is admitted and reports the decision.
    ///
    /// The action runs after the admission is recorded. A panic inside `action`
    /// propagates to the caller; the admission stays recorded.
    fn try_throttle_with_result<F>(&self, action: F) -> ThrottlingResult
    where
        F: FnOnce(),
        Self: Sized,
    {
        let result = self.try_acquire();
        if result.passed() {
            action();
        }
        result
    }

    /// Same as [`Throttler::try_throttle_with_result`], reporting only whether the
    /// action ran.
    fn try_throttle<F>(&self, action: F) -> bool
    where
        F: FnOnce(),
        Self: Sized,
    {
        self.try_throttle_with_result(action).passed()
    }
}
