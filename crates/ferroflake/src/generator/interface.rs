use core::time::Duration;
use std::time::{Instant, SystemTime};

use crate::{Error, FlakeId, ParsedFlake, Result, TimeSource, WorkerId};

/// Upper bound on how long [`FlakeGenerator::next_id`] spins for the clock
/// before giving up with [`Error::WaitTimeout`].
///
/// A healthy clock frees an exhausted sequence window within about one
/// millisecond, so hitting this bound means the time source is stuck.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(100);

/// The result of a single, non-blocking attempt to generate an ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated ID.
        id: FlakeId,
    },
    /// No ID could be generated right now.
    ///
    /// Either the sequence window of the current millisecond is used up, or
    /// (lock-free generators only) another thread won a race for the state.
    Pending {
        /// Milliseconds until the clock is expected to free a new window. `0`
        /// means "retry immediately".
        yield_for: u64,
    },
}

/// The interface shared by every `ferroflake` generator.
///
/// Implementors provide [`FlakeGenerator::try_poll_id`] and
/// [`FlakeGenerator::new_id_at`]; blocking generation, range boundaries and
/// decoding are derived from those.
pub trait FlakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new generator for `worker_id` reading time from `time`.
    fn new(worker_id: WorkerId, time: T) -> Self
    where
        Self: Sized;

    /// The worker id encoded into every ID of this generator.
    fn worker_id(&self) -> WorkerId;

    /// The origin of this generator's timestamps, as a duration since
    /// 1970-01-01 UTC.
    fn epoch(&self) -> Duration;

    /// The clock this generator reads.
    fn time_source(&self) -> &T;

    /// How long [`FlakeGenerator::next_id`] may spin on a clock that does not
    /// advance before failing.
    fn max_wait(&self) -> Duration {
        DEFAULT_MAX_WAIT
    }

    /// Attempts to generate the next ID without blocking.
    ///
    /// # Errors
    ///
    /// - [`Error::TimestampOverflow`] if the clock is past the 41-bit capacity
    /// - [`Error::LockPoisoned`] if a lock-based generator's lock is poisoned
    fn try_poll_id(&self) -> Result<Poll>;

    /// Generates an ID for a caller-supplied time.
    ///
    /// Draws a fresh sequence value from the same counter as
    /// [`FlakeGenerator::next_id`] but bypasses the clock-regression clamp
    /// and the exhaustion wait, and does not move the generator's notion of
    /// "last timestamp". Such IDs are distinguishable from each other within
    /// one 4096-value window but are not ordered relative to IDs from
    /// [`FlakeGenerator::next_id`].
    ///
    /// # Errors
    ///
    /// - [`Error::TimeBeforeEpoch`] if `time` precedes the epoch
    /// - [`Error::TimestampOverflow`] if `time` is past the 41-bit capacity
    fn new_id_at(&self, time: SystemTime) -> Result<FlakeId>;

    /// Generates the next ID, spinning while the current millisecond's
    /// sequence window is exhausted.
    ///
    /// IDs from one generator never decrease, even if the clock does.
    ///
    /// Only a clock that keeps reporting the same millisecond for longer than
    /// [`FlakeGenerator::max_wait`] counts as stuck. The bound restarts every
    /// time the clock moves, and lost races (`yield_for: 0`) are retried
    /// without being measured, since another caller made progress.
    ///
    /// # Errors
    ///
    /// - [`Error::WaitTimeout`] if the clock does not advance within
    ///   [`FlakeGenerator::max_wait`]
    /// - any error from [`FlakeGenerator::try_poll_id`]
    fn next_id(&self) -> Result<FlakeId> {
        // clock reading we are waiting on, and when it was first seen
        let mut stalled: Option<(u64, Instant)> = None;
        loop {
            match self.try_poll_id()? {
                Poll::Ready { id } => return Ok(id),
                Poll::Pending { yield_for: 0 } => {}
                Poll::Pending { .. } => {
                    let now = self.time_source().current_millis();
                    match stalled {
                        Some((seen, since)) if seen == now => {
                            let waited = since.elapsed();
                            if waited > self.max_wait() {
                                return Err(Error::WaitTimeout { waited });
                            }
                        }
                        _ => stalled = Some((now, Instant::now())),
                    }
                }
            }
            core::hint::spin_loop();
        }
    }

    /// The smallest possible ID for `time` (worker id and sequence zero).
    ///
    /// Intended for range-query boundaries, not as an identifier.
    ///
    /// # Errors
    ///
    /// See [`FlakeId::lower_bound`].
    fn boundary_id(&self, time: SystemTime) -> Result<FlakeId> {
        FlakeId::lower_bound(time, self.epoch())
    }

    /// Decodes `id` against this generator's epoch.
    fn parse(&self, id: FlakeId) -> ParsedFlake {
        id.parse(self.epoch())
    }
}
