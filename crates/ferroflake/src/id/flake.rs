use core::{fmt, time::Duration};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Error, ParsedFlake, Result};

/// A 64-bit, time-ordered identifier.
///
/// - 1 bit reserved (always zero, so the value stays positive as an `i64`)
/// - 41 bits timestamp (ms since the epoch, [`FLAKE_EPOCH`] by default)
/// - 10 bits worker ID (see [`WorkerId`])
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21            12 11             0
///              +--------------+----------------+----------------+---------------+
///  Field:      | reserved (1) | timestamp (41) | worker ID (10) | sequence (12) |
///              +--------------+----------------+----------------+---------------+
///              |<----------- MSB ---------- 64 bits ----------- LSB ----------->|
/// ```
///
/// IDs order by timestamp first, then worker id, then sequence, which is the
/// natural ordering of the underlying integer.
///
/// [`FLAKE_EPOCH`]: crate::FLAKE_EPOCH
/// [`WorkerId`]: crate::WorkerId
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlakeId {
    id: u64,
}

const _: () = {
    // Compile-time check: the fields must cover the backing integer exactly,
    // otherwise field boundaries could shift or alias.
    assert!(
        FlakeId::RESERVED_BITS
            + FlakeId::TIMESTAMP_BITS
            + FlakeId::WORKER_ID_BITS
            + FlakeId::SEQUENCE_BITS
            == u64::BITS as u64,
        "FlakeId layout must cover exactly 64 bits"
    );
};

impl FlakeId {
    /// Width of the always-zero sign bit.
    pub const RESERVED_BITS: u64 = 1;

    /// Width of the millisecond timestamp field.
    pub const TIMESTAMP_BITS: u64 = 41;

    /// Width of the worker id field.
    pub const WORKER_ID_BITS: u64 = 10;

    /// Width of the sequence field.
    pub const SEQUENCE_BITS: u64 = 12;

    /// The sequence occupies bits 0 through 11.
    pub const SEQUENCE_SHIFT: u64 = 0;

    /// The worker id occupies bits 12 through 21.
    pub const WORKER_ID_SHIFT: u64 = Self::SEQUENCE_SHIFT + Self::SEQUENCE_BITS;

    /// The timestamp occupies bits 22 through 62.
    pub const TIMESTAMP_SHIFT: u64 = Self::WORKER_ID_SHIFT + Self::WORKER_ID_BITS;

    /// Bitmask for the 41-bit timestamp field (after shifting).
    pub const TIMESTAMP_MASK: u64 = (1 << Self::TIMESTAMP_BITS) - 1;

    /// Bitmask for the 10-bit worker id field (after shifting).
    pub const WORKER_ID_MASK: u64 = (1 << Self::WORKER_ID_BITS) - 1;

    /// Bitmask for the 12-bit sequence field.
    pub const SEQUENCE_MASK: u64 = (1 << Self::SEQUENCE_BITS) - 1;

    /// Packs the three fields, masking each one to its width.
    ///
    /// # Example
    ///
    /// ```
    /// use ferroflake::FlakeId;
    ///
    /// let id = FlakeId::from(1000, 2, 1);
    /// assert_eq!(id.timestamp(), 1000);
    /// assert_eq!(id.worker_id(), 2);
    /// assert_eq!(id.sequence(), 1);
    /// assert_eq!(FlakeId::from(0, 0, 0).to_raw(), 0);
    /// ```
    pub const fn from(timestamp: u64, worker_id: u16, sequence: u16) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let worker_id = (worker_id as u64 & Self::WORKER_ID_MASK) << Self::WORKER_ID_SHIFT;
        let sequence = (sequence as u64 & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | worker_id | sequence,
        }
    }

    /// Packs the three fields, asserting (in debug builds) that none of them
    /// overflows its width.
    pub fn from_components(timestamp: u64, worker_id: u16, sequence: u16) -> Self {
        debug_assert!(timestamp <= Self::TIMESTAMP_MASK, "timestamp overflow");
        debug_assert!(
            u64::from(worker_id) <= Self::WORKER_ID_MASK,
            "worker_id overflow"
        );
        debug_assert!(u64::from(sequence) <= Self::SEQUENCE_MASK, "sequence overflow");
        Self::from(timestamp, worker_id, sequence)
    }

    /// Wraps a raw value without validation.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Returns the raw 64-bit value.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Returns the value as an `i64`. Always non-negative for generated IDs.
    pub const fn to_i64(&self) -> i64 {
        self.id as i64
    }

    /// Extracts the timestamp (ms since the epoch) from the packed ID.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the worker id from the packed ID.
    pub const fn worker_id(&self) -> u16 {
        ((self.id >> Self::WORKER_ID_SHIFT) & Self::WORKER_ID_MASK) as u16
    }

    /// Extracts the sequence number from the packed ID.
    pub const fn sequence(&self) -> u16 {
        ((self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK) as u16
    }

    /// Returns the maximum representable timestamp value.
    pub const fn max_timestamp() -> u64 {
        Self::TIMESTAMP_MASK
    }

    /// Returns the maximum representable worker id.
    pub const fn max_worker_id() -> u16 {
        Self::WORKER_ID_MASK as u16
    }

    /// Returns the maximum representable sequence value.
    pub const fn max_sequence() -> u16 {
        Self::SEQUENCE_MASK as u16
    }

    /// The smallest ID whose timestamp is `time`: worker id and sequence are
    /// zero.
    ///
    /// Not a real identifier; use it as the inclusive lower boundary of a
    /// range query.
    ///
    /// # Errors
    ///
    /// - [`Error::TimeBeforeEpoch`] if `time` precedes the epoch
    /// - [`Error::TimestampOverflow`] if `time` is past the 41-bit capacity
    pub fn lower_bound(time: SystemTime, epoch: Duration) -> Result<Self> {
        let millis = millis_since_epoch(time, epoch)?;
        Ok(Self::from(millis, 0, 0))
    }

    /// The largest ID whose timestamp is `time`: worker id and sequence bits
    /// are all ones.
    ///
    /// # Errors
    ///
    /// Same as [`Self::lower_bound`].
    pub fn upper_bound(time: SystemTime, epoch: Duration) -> Result<Self> {
        let millis = millis_since_epoch(time, epoch)?;
        Ok(Self::from(
            millis,
            Self::max_worker_id(),
            Self::max_sequence(),
        ))
    }

    /// Splits the ID into wall-clock time, worker id and sequence.
    ///
    /// See [`ParsedFlake::from_raw`].
    pub fn parse(self, epoch: Duration) -> ParsedFlake {
        ParsedFlake::from_raw(self.id, epoch)
    }

    /// Returns the ID as a zero-padded 20-digit string.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }
}

/// Milliseconds between `epoch` and `time`, checked against the timestamp
/// field's capacity.
pub(crate) fn millis_since_epoch(time: SystemTime, epoch: Duration) -> Result<u64> {
    let origin = UNIX_EPOCH + epoch;
    let elapsed = time.duration_since(origin).map_err(|e| Error::TimeBeforeEpoch {
        behind_by: e.duration(),
    })?;
    checked_timestamp(elapsed.as_millis())
}

/// Rejects timestamps that do not fit in 41 bits.
pub(crate) fn checked_timestamp(millis: u128) -> Result<u64> {
    if millis > u128::from(FlakeId::TIMESTAMP_MASK) {
        return Err(Error::TimestampOverflow { millis });
    }
    Ok(millis as u64)
}

impl From<FlakeId> for u64 {
    fn from(id: FlakeId) -> Self {
        id.to_raw()
    }
}

impl fmt::Display for FlakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for FlakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlakeId")
            .field("id", &format_args!("{} (0x{:x})", self.id, self.id))
            .field("padded", &self.to_padded_string())
            .field(
                "timestamp",
                &format_args!("{} (0x{:x})", self.timestamp(), self.timestamp()),
            )
            .field(
                "worker_id",
                &format_args!("{} (0x{:x})", self.worker_id(), self.worker_id()),
            )
            .field(
                "sequence",
                &format_args!("{} (0x{:x})", self.sequence(), self.sequence()),
            )
            .finish()
    }
}
