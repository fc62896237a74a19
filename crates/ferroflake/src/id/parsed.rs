use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::FlakeId;

/// The decoded components of a [`FlakeId`].
///
/// Decoding is unconditional bit extraction: any 64-bit value decodes, whether
/// or not it was produced by a generator. Callers that need validation must
/// range-check the fields themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParsedFlake {
    /// Absolute wall-clock time: `epoch + timestamp` milliseconds. `None` if
    /// that instant is beyond what [`SystemTime`] can represent on this
    /// platform, which only happens with an absurdly distant epoch.
    pub time: Option<SystemTime>,
    /// Milliseconds since the epoch, as stored in the 41-bit field.
    pub timestamp: u64,
    /// The 10-bit worker id.
    pub worker_id: u16,
    /// The 12-bit sequence number.
    pub sequence: u16,
}

impl ParsedFlake {
    /// Splits a raw 64-bit value into its components, resolving the timestamp
    /// against `epoch` (a duration since 1970-01-01 UTC).
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::{Duration, UNIX_EPOCH};
    /// use ferroflake::{FLAKE_EPOCH, FlakeId, ParsedFlake};
    ///
    /// let raw = FlakeId::from(1_000, 7, 3).to_raw();
    /// let parsed = ParsedFlake::from_raw(raw, FLAKE_EPOCH);
    ///
    /// assert_eq!(parsed.time, Some(UNIX_EPOCH + FLAKE_EPOCH + Duration::from_secs(1)));
    /// assert_eq!(parsed.worker_id, 7);
    /// assert_eq!(parsed.sequence, 3);
    /// ```
    pub fn from_raw(raw: u64, epoch: Duration) -> Self {
        let id = FlakeId::from_raw(raw);
        let timestamp = id.timestamp();
        Self {
            time: UNIX_EPOCH
                .checked_add(epoch)
                .and_then(|origin| origin.checked_add(Duration::from_millis(timestamp))),
            timestamp,
            worker_id: id.worker_id(),
            sequence: id.sequence(),
        }
    }

    /// Re-encodes the components. The reserved bit of the original value, if
    /// set, is not preserved.
    pub const fn to_id(&self) -> FlakeId {
        FlakeId::from(self.timestamp, self.worker_id, self.sequence)
    }
}
