use core::time::Duration;

/// A result type defaulting to the crate-wide [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `ferroflake` can produce.
///
/// Most of these are configuration problems that should surface once, at
/// startup. Sequence exhaustion and clock regression are handled internally
/// and never show up here.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The configured epoch lies after the current wall-clock time.
    #[error("epoch is {ahead_by:?} ahead of the system clock")]
    EpochInFuture {
        /// How far the epoch is ahead of "now".
        ahead_by: Duration,
    },

    /// The system clock reports a time before 1970-01-01 UTC.
    #[error("system clock is before the UNIX epoch")]
    ClockBeforeUnixEpoch,

    /// An explicitly assigned worker id does not fit in 10 bits.
    #[error("worker id {worker_id} is out of range (0-{max})")]
    WorkerIdOutOfRange {
        /// The rejected value.
        worker_id: u64,
        /// The largest accepted value.
        max: u64,
    },

    /// The timestamp no longer fits in the 41-bit field.
    ///
    /// This is a hard capacity ceiling (about 69 years after the epoch) and is
    /// never wrapped silently.
    #[error("timestamp {millis}ms since epoch exceeds the 41-bit capacity")]
    TimestampOverflow {
        /// The offending millisecond value.
        millis: u128,
    },

    /// A caller-supplied time lies before the generator's epoch.
    #[error("time is {behind_by:?} before the epoch")]
    TimeBeforeEpoch {
        /// How far before the epoch the supplied time is.
        behind_by: Duration,
    },

    /// The clock did not advance within the configured spin-wait bound.
    ///
    /// This only happens if the time source is stuck; a healthy clock frees a
    /// saturated sequence window within about one millisecond.
    #[error("clock did not advance within {waited:?}")]
    WaitTimeout {
        /// How long the generator spun before giving up.
        waited: Duration,
    },

    /// The generator state lock was poisoned by a panicking thread.
    ///
    /// Not available with the `parking-lot` feature, whose mutexes do not
    /// poison.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
