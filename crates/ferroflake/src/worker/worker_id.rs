use core::fmt;
use std::{
    hash::{DefaultHasher, Hash, Hasher},
    process,
    sync::OnceLock,
    thread,
};

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::{Error, FlakeId, RandSource, Result, ThreadRandom};

/// The process-wide worker id, resolved on first use.
static PROCESS_WORKER_ID: OnceLock<WorkerId> = OnceLock::new();

/// A 10-bit identifier for the generator that minted an ID.
///
/// Two ways to obtain one:
///
/// - **Derived** ([`WorkerId::process`], [`WorkerId::resolve`]): the upper 5
///   bits come from a cryptographically secure random node id, the lower 5
///   bits from `pid XOR tid`. No registry is needed, but uniqueness across
///   processes is only probabilistic: with 1024 possible values, two
///   generators may still end up with the same id, and nothing detects it.
/// - **Assigned** ([`WorkerId::new`]): the deployment hands each instance a
///   distinct value. This is the only way to get a hard uniqueness guarantee.
///
/// ```text
///  Bit Index:      9           5 4                  0
///              +--------------+---------------------+
///  Field:      | node id (5)  | (pid ^ tid) low (5) |
///              +--------------+---------------------+
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct WorkerId(u16);

impl WorkerId {
    /// Number of bits a worker id occupies in a [`FlakeId`].
    pub const BITS: u32 = FlakeId::WORKER_ID_BITS as u32;

    /// The largest representable worker id (1023).
    pub const MAX: u16 = FlakeId::WORKER_ID_MASK as u16;

    /// Worker id `0`, mostly useful for tests and range boundaries.
    pub const ZERO: Self = Self(0);

    /// Width of each half of a derived worker id.
    const HALF_BITS: u32 = Self::BITS / 2;
    const HALF_MASK: u64 = (1 << Self::HALF_BITS) - 1;

    /// Exclusive upper bound of the random node id range `[1, 1024)`.
    const NODE_ID_END: u64 = 1 << Self::BITS;

    /// Wraps an explicitly assigned worker id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerIdOutOfRange`] if `id` does not fit in 10 bits.
    ///
    /// # Example
    /// ```
    /// use ferroflake::WorkerId;
    ///
    /// assert_eq!(WorkerId::new(42).unwrap().get(), 42);
    /// assert!(WorkerId::new(1024).is_err());
    /// ```
    pub fn new(id: u16) -> Result<Self> {
        if id > Self::MAX {
            return Err(Error::WorkerIdOutOfRange {
                worker_id: u64::from(id),
                max: u64::from(Self::MAX),
            });
        }
        Ok(Self(id))
    }

    /// Combines a node id with process and thread identifiers.
    ///
    /// `worker_id = (node_id & 0x1F) << 5 | ((pid ^ tid) & 0x1F)`
    pub const fn derive(node_id: u64, pid: u32, tid: u64) -> Self {
        let node = node_id & Self::HALF_MASK;
        let local = (pid as u64 ^ tid) & Self::HALF_MASK;
        Self(((node << Self::HALF_BITS) | local) as u16)
    }

    /// Derives a worker id for the calling thread of the current process.
    ///
    /// Every call draws a fresh node id, so two calls usually disagree. Use
    /// [`WorkerId::process`] for the cached, process-wide value.
    pub fn resolve<R: RandSource<u64>>(rand: &R) -> Self {
        Self::resolve_with(rand, process::id(), current_thread_id())
    }

    /// Like [`WorkerId::resolve`], with explicit process and thread ids.
    pub fn resolve_with<R: RandSource<u64>>(rand: &R, pid: u32, tid: u64) -> Self {
        let node_id = draw_node_id(rand);
        let worker_id = Self::derive(node_id, pid, tid);
        #[cfg(feature = "tracing")]
        debug!(node_id, pid, tid, worker_id = worker_id.0, "derived worker id");
        worker_id
    }

    /// Returns the worker id of this process.
    ///
    /// Resolved with [`ThreadRandom`] the first time any thread asks and
    /// cached for the lifetime of the process. Concurrent first calls agree on
    /// a single value.
    pub fn process() -> Self {
        *PROCESS_WORKER_ID.get_or_init(|| Self::resolve(&ThreadRandom))
    }

    /// Returns the raw 10-bit value.
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<WorkerId> for u16 {
    fn from(worker_id: WorkerId) -> Self {
        worker_id.0
    }
}

impl From<WorkerId> for u64 {
    fn from(worker_id: WorkerId) -> Self {
        u64::from(worker_id.0)
    }
}

impl TryFrom<u16> for WorkerId {
    type Error = Error;

    fn try_from(id: u16) -> Result<Self> {
        Self::new(id)
    }
}

/// Maps a random `u64` onto `[1, 1024)`.
///
/// The modulo bias over a 64-bit draw is below 2^-50.
fn draw_node_id<R: RandSource<u64>>(rand: &R) -> u64 {
    1 + rand.rand() % (WorkerId::NODE_ID_END - 1)
}

/// `ThreadId` has no stable integer accessor, so hash it.
fn current_thread_id() -> u64 {
    let mut hasher = DefaultHasher::new();
    thread::current().id().hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRand(u64);

    impl RandSource<u64> for FixedRand {
        fn rand(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn derive_packs_node_and_local_halves() {
        let id = WorkerId::derive(0b10110, 0b00011, 0b00101);
        assert_eq!(id.get(), 0b10110_00110);
    }

    #[test]
    fn derive_truncates_inputs_to_five_bits() {
        let id = WorkerId::derive(0xFFFF_FFE1, 0xABCD_EF00, 0x0000_0000_DEAD_BE02);
        assert_eq!(id.get() >> 5, 0x01);
        assert_eq!(u64::from(id.get() & 0x1F), (0xABCD_EF00_u64 ^ 0xDEAD_BE02) & 0x1F);
        assert!(id.get() <= WorkerId::MAX);
    }

    #[test]
    fn derive_never_exceeds_ten_bits() {
        for node in [0, 1, 31, 32, 1023, u64::MAX] {
            for pid in [0, 7, u32::MAX] {
                assert!(WorkerId::derive(node, pid, u64::MAX).get() <= WorkerId::MAX);
            }
        }
    }

    #[test]
    fn node_id_stays_in_range() {
        for raw in [0, 1, 1022, 1023, 1024, u64::MAX] {
            let node = draw_node_id(&FixedRand(raw));
            assert!((1..1024).contains(&node), "{raw} -> {node}");
        }
        assert_eq!(draw_node_id(&FixedRand(0)), 1);
        assert_eq!(draw_node_id(&FixedRand(1022)), 1023);
    }

    #[test]
    fn resolve_with_is_deterministic_for_fixed_inputs() {
        let rand = FixedRand(9);
        let a = WorkerId::resolve_with(&rand, 1234, 99);
        let b = WorkerId::resolve_with(&rand, 1234, 99);
        assert_eq!(a, b);
        // node id 10 -> upper half 0b01010
        assert_eq!(a.get() >> 5, 10);
        assert_eq!(u64::from(a.get() & 0x1F), (1234 ^ 99) & 0x1F);
    }

    #[test]
    fn process_worker_id_is_cached() {
        let first = WorkerId::process();
        let from_threads: Vec<WorkerId> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(WorkerId::process)).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(from_threads.iter().all(|id| *id == first));
    }

    #[test]
    fn new_rejects_out_of_range() {
        assert_eq!(WorkerId::new(1023).unwrap().get(), 1023);
        assert_eq!(
            WorkerId::new(1024),
            Err(Error::WorkerIdOutOfRange {
                worker_id: 1024,
                max: 1023
            })
        );
        assert!(WorkerId::try_from(u16::MAX).is_err());
    }
}
