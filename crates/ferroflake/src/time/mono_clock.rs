use core::time::Duration;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::{Error, FLAKE_EPOCH, Result, TimeSource};

/// A monotonic time source that returns elapsed time since construction,
/// offset from a user-defined epoch.
///
/// The wall clock is read exactly once, when the clock is built, to compute
/// how many milliseconds separate the epoch from "now". After that only a
/// monotonic [`Instant`] is consulted, so NTP corrections or manual changes
/// to the system clock cannot move timestamps backward.
///
/// Cloning is cheap; clones share the same anchor and therefore agree on the
/// current time.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    anchor: Instant,
    anchor_millis: u64,
    epoch: Duration,
}

impl Default for MonotonicClock {
    /// Constructs a monotonic clock aligned to [`FLAKE_EPOCH`].
    ///
    /// Panics if the system time is earlier than the epoch.
    fn default() -> Self {
        Self::with_epoch(FLAKE_EPOCH)
    }
}

impl MonotonicClock {
    /// Constructs a monotonic clock using `epoch` as the origin (t = 0),
    /// specified as a [`Duration`] since the Unix epoch.
    ///
    /// # Panics
    ///
    /// Panics if the current system time is earlier than the given epoch. Use
    /// [`Self::try_with_epoch`] to handle that case.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use ferroflake::{MonotonicClock, TimeSource, FLAKE_EPOCH};
    ///
    /// let clock = MonotonicClock::with_epoch(FLAKE_EPOCH);
    /// let before = clock.current_millis();
    /// std::thread::sleep(Duration::from_millis(5));
    /// assert!(clock.current_millis() >= before + 5);
    /// ```
    pub fn with_epoch(epoch: Duration) -> Self {
        match Self::try_with_epoch(epoch) {
            Ok(clock) => clock,
            Err(e) => panic!("invalid clock configuration: {e}"),
        }
    }

    /// Fallible version of [`Self::with_epoch`].
    ///
    /// # Errors
    ///
    /// - [`Error::ClockBeforeUnixEpoch`] if the system clock predates 1970
    /// - [`Error::EpochInFuture`] if `epoch` is after the current system time
    pub fn try_with_epoch(epoch: Duration) -> Result<Self> {
        let anchor = Instant::now();
        let system_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| Error::ClockBeforeUnixEpoch)?;
        let since_epoch = system_now
            .checked_sub(epoch)
            .ok_or_else(|| Error::EpochInFuture {
                ahead_by: epoch - system_now,
            })?;

        Ok(Self {
            anchor,
            anchor_millis: since_epoch.as_millis() as u64,
            epoch,
        })
    }
}

impl TimeSource for MonotonicClock {
    /// Returns the number of milliseconds since the configured epoch, based on
    /// the elapsed monotonic time since construction.
    fn current_millis(&self) -> u64 {
        self.anchor_millis + self.anchor.elapsed().as_millis() as u64
    }

    fn epoch(&self) -> Duration {
        self.epoch
    }
}
