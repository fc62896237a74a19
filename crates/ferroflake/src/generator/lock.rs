use core::time::Duration;
use std::time::SystemTime;

#[cfg(feature = "tracing")]
use tracing::{debug, instrument};

use crate::{
    FlakeId, MonotonicClock, Result, TimeSource, WorkerId,
    generator::{
        DEFAULT_MAX_WAIT, FlakeGenerator, Mutex, Poll, SequenceCounter,
        state::{Step, advance},
    },
    id::{checked_timestamp, millis_since_epoch},
};

/// A lock-based ID generator suitable for multi-threaded environments.
///
/// The last issued ID lives behind a [`Mutex`]; clock reading, the sequence
/// draw and the regression and exhaustion checks all happen while it is held,
/// so no interleaving of callers can produce a duplicate.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Fair access across threads
/// - ✅ Works on targets without 64-bit compare-and-swap
///
/// ## Recommended When
/// - Fair access across threads is important
/// - Your target doesn't support 64-bit atomics
///
/// ## See Also
/// - [`AtomicFlakeGenerator`]
///
/// [`AtomicFlakeGenerator`]: crate::AtomicFlakeGenerator
pub struct LockFlakeGenerator<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<Option<FlakeId>>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<Option<FlakeId>>,
    sequence: SequenceCounter,
    worker_id: WorkerId,
    max_wait: Duration,
    time: T,
}

impl<T> LockFlakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new [`LockFlakeGenerator`] for `worker_id`.
    ///
    /// The sequence counter starts at zero and no ID has been issued yet.
    ///
    /// # Example
    /// ```
    /// use ferroflake::{FlakeGenerator, LockFlakeGenerator, MonotonicClock, WorkerId};
    ///
    /// let generator = LockFlakeGenerator::new(WorkerId::new(3).unwrap(), MonotonicClock::default());
    /// let id = generator.next_id().unwrap();
    /// assert_eq!(id.worker_id(), 3);
    /// ```
    pub fn new(worker_id: WorkerId, time: T) -> Self {
        Self::with_state(None, 0, worker_id, time)
    }

    /// Creates a generator that behaves as if it had just issued the ID
    /// `(timestamp, worker_id, sequence)`.
    ///
    /// Primarily useful for tests and for controlling the starting point of
    /// the generator manually. The counter resumes at `sequence + 1`.
    pub fn from_components(timestamp: u64, worker_id: WorkerId, sequence: u16, time: T) -> Self {
        let last = FlakeId::from_components(timestamp, worker_id.get(), sequence);
        Self::with_state(Some(last), u64::from(sequence) + 1, worker_id, time)
    }

    fn with_state(last: Option<FlakeId>, counter: u64, worker_id: WorkerId, time: T) -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(Mutex::new(last)),
            #[cfg(not(feature = "cache-padded"))]
            state: Mutex::new(last),
            sequence: SequenceCounter::starting_at(counter),
            worker_id,
            max_wait: DEFAULT_MAX_WAIT,
            time,
        }
    }

    /// Overrides how long [`FlakeGenerator::next_id`] may spin for the clock.
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Returns the sequence counter shared by `next_id` and `new_id_at`.
    pub fn sequence_counter(&self) -> &SequenceCounter {
        &self.sequence
    }

    /// Attempts to generate the next ID without blocking.
    ///
    /// Returns [`Poll::Pending`] while the current millisecond's sequence
    /// window is used up.
    ///
    /// # Errors
    /// - [`Error::TimestampOverflow`] if the clock is past the 41-bit capacity
    /// - [`Error::LockPoisoned`] if the lock has been poisoned
    ///
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    /// [`Error::LockPoisoned`]: crate::Error
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<Poll> {
        let mut last = {
            #[cfg(feature = "parking-lot")]
            {
                self.state.lock()
            }
            #[cfg(not(feature = "parking-lot"))]
            {
                self.state.lock()?
            }
        };

        let now = checked_timestamp(u128::from(self.time.current_millis()))?;

        // Check against the value the counter would hand out before drawing,
        // so spinning on an exhausted window does not burn sequence values.
        let peeked = (self.sequence.current() & FlakeId::SEQUENCE_MASK) as u16;
        if let Step::Exhausted { yield_for } = advance(*last, now, peeked) {
            return Ok(Self::cold_exhausted(yield_for));
        }

        // `new_id_at` draws without the lock, so the drawn value may differ
        // from the peeked one.
        match advance(*last, now, self.sequence.next()) {
            Step::Issue {
                timestamp,
                sequence,
            } => {
                #[cfg(feature = "tracing")]
                {
                    if timestamp > now {
                        debug!(now, timestamp, "clock behind last timestamp; clamped");
                    }
                }
                let id = FlakeId::from_components(timestamp, self.worker_id.get(), sequence);
                *last = Some(id);
                Ok(Poll::Ready { id })
            }
            Step::Exhausted { yield_for } => Ok(Self::cold_exhausted(yield_for)),
        }
    }

    /// Generates an ID for a caller-supplied time. See
    /// [`FlakeGenerator::new_id_at`].
    ///
    /// # Errors
    /// - [`Error::TimeBeforeEpoch`] if `time` precedes the epoch
    /// - [`Error::TimestampOverflow`] if `time` is past the 41-bit capacity
    ///
    /// [`Error::TimeBeforeEpoch`]: crate::Error::TimeBeforeEpoch
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn new_id_at(&self, time: SystemTime) -> Result<FlakeId> {
        let timestamp = millis_since_epoch(time, self.time.epoch())?;
        Ok(FlakeId::from_components(
            timestamp,
            self.worker_id.get(),
            self.sequence.next(),
        ))
    }

    #[cold]
    #[inline(never)]
    fn cold_exhausted(yield_for: u64) -> Poll {
        #[cfg(feature = "tracing")]
        debug!(yield_for, "sequence window exhausted");
        Poll::Pending { yield_for }
    }
}

impl Default for LockFlakeGenerator<MonotonicClock> {
    /// A generator for this process's [`WorkerId::process`] reading a
    /// [`MonotonicClock`] anchored at [`FLAKE_EPOCH`].
    ///
    /// [`FLAKE_EPOCH`]: crate::FLAKE_EPOCH
    fn default() -> Self {
        Self::new(WorkerId::process(), MonotonicClock::default())
    }
}

impl<T> FlakeGenerator<T> for LockFlakeGenerator<T>
where
    T: TimeSource,
{
    fn new(worker_id: WorkerId, time: T) -> Self {
        Self::new(worker_id, time)
    }

    fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    fn epoch(&self) -> Duration {
        self.time.epoch()
    }

    fn time_source(&self) -> &T {
        &self.time
    }

    fn max_wait(&self) -> Duration {
        self.max_wait
    }

    fn try_poll_id(&self) -> Result<Poll> {
        self.try_poll_id()
    }

    fn new_id_at(&self, time: SystemTime) -> Result<FlakeId> {
        self.new_id_at(time)
    }
}
