/// Errors produced when building a throttler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThrottleError {
    /// The requested budget lies outside `[Rps::MIN, Rps::MAX]`.
    ///
    /// [`Rps::MIN`]: crate::Rps::MIN
    /// [`Rps::MAX`]: crate::Rps::MAX
    #[error("RPS should be between 1 and 100000, got {0}")]
    InvalidRps(i64),
}
