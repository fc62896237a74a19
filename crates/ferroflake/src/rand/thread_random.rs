use ::rand::{Rng, rng};

use crate::RandSource;

/// A `RandSource` that uses the thread-local RNG (`rand::rng()`).
///
/// The RNG is cryptographically secure (ChaCha-based), seeded from the
/// operating system and reseeded periodically. Processes started at the same
/// instant therefore do not draw correlated values, which a time-seeded
/// statistical PRNG cannot promise.
///
/// This type does **not** store the RNG itself; it accesses the thread-local
/// generator on each call, so it is `Send + Sync` and may be shared freely.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl RandSource<u64> for ThreadRandom {
    fn rand(&self) -> u64 {
        rng().random()
    }
}
