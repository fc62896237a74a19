use core::time::Duration;
use std::time::SystemTime;

use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::{debug, instrument};

use crate::{
    FlakeId, MonotonicClock, Result, TimeSource, WorkerId,
    generator::{
        DEFAULT_MAX_WAIT, FlakeGenerator, Poll, SequenceCounter,
        state::{Step, advance},
    },
    id::{checked_timestamp, millis_since_epoch},
};

/// State value meaning "no ID issued yet". The reserved bit is set, so no
/// generated ID can ever equal it.
const NOTHING_ISSUED: u64 = u64::MAX;

/// A lock-free ID generator suitable for multi-threaded environments.
///
/// The last issued ID is stored in a single [`AtomicU64`] and replaced with
/// `compare_exchange`. Every successful exchange installs an ID strictly
/// greater than the one it replaced, which is what makes concurrently issued
/// IDs unique. Sequence values come from the shared [`SequenceCounter`].
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Lock-free on targets with 64-bit atomics
///
/// ## Caveats
/// A caller that loses a race retries the exchange with the sequence value it
/// already drew. The value is skipped only when a caller that drew a later
/// value published first in the same millisecond; that caller then gets
/// [`Poll::Pending`] with `yield_for: 0`. Under heavy contention a millisecond
/// may therefore hold fewer than 4096 IDs. Use [`LockFlakeGenerator`] when
/// the full per-millisecond capacity is required.
///
/// ## Recommended When
/// - You're in a multi-threaded environment
/// - Fair access is sacrificed for higher throughput
/// - Bursts stay well below 4096 IDs per millisecond
///
/// ## See Also
/// - [`LockFlakeGenerator`]
///
/// [`LockFlakeGenerator`]: crate::LockFlakeGenerator
pub struct AtomicFlakeGenerator<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicU64,
    sequence: SequenceCounter,
    worker_id: WorkerId,
    max_wait: Duration,
    time: T,
}

impl<T> AtomicFlakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new [`AtomicFlakeGenerator`] for `worker_id`.
    ///
    /// # Example
    /// ```
    /// use ferroflake::{AtomicFlakeGenerator, FlakeGenerator, MonotonicClock, WorkerId};
    ///
    /// let generator = AtomicFlakeGenerator::new(WorkerId::process(), MonotonicClock::default());
    /// let a = generator.next_id().unwrap();
    /// let b = generator.next_id().unwrap();
    /// assert!(a < b);
    /// ```
    pub fn new(worker_id: WorkerId, time: T) -> Self {
        Self::with_state(NOTHING_ISSUED, 0, worker_id, time)
    }

    /// Creates a generator that behaves as if it had just issued the ID
    /// `(timestamp, worker_id, sequence)`. The counter resumes at
    /// `sequence + 1`.
    pub fn from_components(timestamp: u64, worker_id: WorkerId, sequence: u16, time: T) -> Self {
        let last = FlakeId::from_components(timestamp, worker_id.get(), sequence);
        Self::with_state(last.to_raw(), u64::from(sequence) + 1, worker_id, time)
    }

    fn with_state(raw: u64, counter: u64, worker_id: WorkerId, time: T) -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(AtomicU64::new(raw)),
            #[cfg(not(feature = "cache-padded"))]
            state: AtomicU64::new(raw),
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
    /// window is used up, or with `yield_for: 0` after losing a race to
    /// another thread.
    ///
    /// # Errors
    /// - [`Error::TimestampOverflow`] if the clock is past the 41-bit capacity
    ///
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<Poll> {
        let now = checked_timestamp(u128::from(self.time.current_millis()))?;

        let current_raw = self.state.load(Ordering::Relaxed);
        let last = (current_raw != NOTHING_ISSUED).then(|| FlakeId::from_raw(current_raw));

        let peeked = (self.sequence.current() & FlakeId::SEQUENCE_MASK) as u16;
        if let Step::Exhausted { yield_for } = advance(last, now, peeked) {
            return Ok(Self::cold_exhausted(yield_for));
        }

        Ok(self.install(current_raw, now, self.sequence.next()))
    }

    /// Publishes an ID carrying the drawn `sequence`, reloading the state
    /// after every lost exchange.
    ///
    /// The drawn value is only given up when a caller holding a later value
    /// won first in the same millisecond; the result is then
    /// `Pending { yield_for: 0 }` and the next poll peeks again.
    fn install(&self, mut current_raw: u64, now: u64, sequence: u16) -> Poll {
        let mut raced = false;
        loop {
            let last = (current_raw != NOTHING_ISSUED).then(|| FlakeId::from_raw(current_raw));
            let timestamp = match advance(last, now, sequence) {
                Step::Issue { timestamp, .. } => timestamp,
                Step::Exhausted { .. } if raced => return Poll::Pending { yield_for: 0 },
                Step::Exhausted { yield_for } => return Self::cold_exhausted(yield_for),
            };

            let id = FlakeId::from_components(timestamp, self.worker_id.get(), sequence);
            match self.state.compare_exchange(
                current_raw,
                id.to_raw(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    #[cfg(feature = "tracing")]
                    {
                        if timestamp > now {
                            debug!(now, timestamp, "clock behind last timestamp; clamped");
                        }
                    }
                    return Poll::Ready { id };
                }
                // another thread won the race; try again against its ID
                Err(actual) => {
                    current_raw = actual;
                    raced = true;
                }
            }
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

impl Default for AtomicFlakeGenerator<MonotonicClock> {
    /// A generator for this process's [`WorkerId::process`] reading a
    /// [`MonotonicClock`] anchored at [`FLAKE_EPOCH`].
    ///
    /// [`FLAKE_EPOCH`]: crate::FLAKE_EPOCH
    fn default() -> Self {
        Self::new(WorkerId::process(), MonotonicClock::default())
    }
}

impl<T> FlakeGenerator<T> for AtomicFlakeGenerator<T>
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
