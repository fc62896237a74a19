use core::time::Duration;
use std::sync::Arc;

/// Default epoch: Thursday, March 15, 2018 00:00:00 UTC
///
/// With a 41-bit millisecond timestamp this epoch lasts until mid-2087. Never
/// change the epoch once IDs have been persisted: IDs minted against different
/// epochs do not sort against each other.
pub const FLAKE_EPOCH: Duration = Duration::from_millis(1_521_072_000_000);

/// A trait for time sources that return milliseconds since an epoch.
///
/// This abstraction allows you to plug in the real [`MonotonicClock`] or a
/// mocked time source in tests.
///
/// # Example
///
/// ```
/// use ferroflake::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// assert_eq!(time.epoch(), ferroflake::FLAKE_EPOCH);
/// ```
///
/// [`MonotonicClock`]: crate::MonotonicClock
pub trait TimeSource {
    /// Returns the current time in milliseconds since [`TimeSource::epoch`].
    fn current_millis(&self) -> u64;

    /// The origin (t = 0) of [`TimeSource::current_millis`], as a duration
    /// since 1970-01-01 UTC.
    fn epoch(&self) -> Duration {
        FLAKE_EPOCH
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }

    fn epoch(&self) -> Duration {
        (**self).epoch()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }

    fn epoch(&self) -> Duration {
        (**self).epoch()
    }
}
