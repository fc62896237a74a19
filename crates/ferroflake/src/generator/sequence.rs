use portable_atomic::{AtomicU64, Ordering};

use crate::FlakeId;

/// A shared, ever-increasing counter whose low 12 bits become the sequence
/// field.
///
/// The counter is never reset when the millisecond advances. It keeps counting
/// upward and wraps naturally; only the masked value is encoded. Successive
/// IDs therefore do not restart at sequence 0 every millisecond.
///
/// Built on [`portable_atomic::AtomicU64`], so it also works on targets
/// without native 64-bit atomics.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    #[cfg(feature = "cache-padded")]
    counter: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    counter: AtomicU64,
}

impl SequenceCounter {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a counter starting at `value`.
    pub fn starting_at(value: u64) -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            counter: crossbeam_utils::CachePadded::new(AtomicU64::new(value)),
            #[cfg(not(feature = "cache-padded"))]
            counter: AtomicU64::new(value),
        }
    }

    /// Advances the counter and returns the sequence value to encode.
    ///
    /// # Example
    /// ```
    /// use ferroflake::SequenceCounter;
    ///
    /// let counter = SequenceCounter::starting_at(4095);
    /// assert_eq!(counter.next(), 4095);
    /// assert_eq!(counter.next(), 0);
    /// assert_eq!(counter.current(), 4097);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> u16 {
        let raw = self.counter.fetch_add(1, Ordering::Relaxed);
        (raw & FlakeId::SEQUENCE_MASK) as u16
    }

    /// Returns the raw, unmasked counter value.
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::thread::scope;

    #[test]
    fn masks_to_twelve_bits() {
        let counter = SequenceCounter::new();
        for expected in 0..=4095 {
            assert_eq!(counter.next(), expected);
        }
        assert_eq!(counter.next(), 0);
        assert_eq!(counter.current(), 4097);
    }

    #[test]
    fn wraps_at_u64_max() {
        let counter = SequenceCounter::starting_at(u64::MAX);
        assert_eq!(counter.next(), 4095);
        assert_eq!(counter.next(), 0);
        assert_eq!(counter.current(), 1);
    }

    #[test]
    fn concurrent_draws_are_distinct() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 512;

        let counter = SequenceCounter::new();
        let seen = Mutex::new(HashSet::new());

        scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for _ in 0..PER_THREAD {
                        assert!(seen.lock().unwrap().insert(counter.next()));
                    }
                });
            }
        });

        assert_eq!(seen.lock().unwrap().len(), THREADS * PER_THREAD);
        assert_eq!(counter.current(), (THREADS * PER_THREAD) as u64);
    }
}
