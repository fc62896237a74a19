use core::cmp::Ordering;

use crate::FlakeId;

/// What a generator should do for a given clock reading and sequence value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// Encode an ID with these fields.
    Issue { timestamp: u64, sequence: u16 },
    /// The sequence window for `last`'s millisecond is used up; retry once
    /// the clock has moved `yield_for` milliseconds forward.
    Exhausted { yield_for: u64 },
}

/// Decides the next `(timestamp, sequence)` pair given the last ID issued by
/// the same generator.
///
/// - A clock reading behind `last` is clamped to `last`'s timestamp, so the
///   encoded timestamp never decreases.
/// - Within one millisecond the sequence must strictly increase. A value that
///   is not greater than the last one means the 12-bit counter wrapped, and
///   issuing it could repeat an earlier `(timestamp, sequence)` pair.
pub(crate) fn advance(last: Option<FlakeId>, now: u64, sequence: u16) -> Step {
    let Some(last) = last else {
        return Step::Issue {
            timestamp: now,
            sequence,
        };
    };

    let last_ts = last.timestamp();
    match now.cmp(&last_ts) {
        Ordering::Greater => Step::Issue {
            timestamp: now,
            sequence,
        },
        Ordering::Equal | Ordering::Less if sequence > last.sequence() => Step::Issue {
            timestamp: last_ts,
            sequence,
        },
        Ordering::Equal | Ordering::Less => cold_exhausted(now, last_ts),
    }
}

#[cold]
#[inline(never)]
fn cold_exhausted(now: u64, last_ts: u64) -> Step {
    debug_assert!(last_ts >= now);
    Step::Exhausted {
        yield_for: last_ts - now + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn last(ts: u64, seq: u16) -> Option<FlakeId> {
        Some(FlakeId::from(ts, 5, seq))
    }

    #[test]
    fn first_id_uses_clock_as_is() {
        assert_eq!(
            advance(None, 0, 0),
            Step::Issue {
                timestamp: 0,
                sequence: 0
            }
        );
    }

    #[test]
    fn new_millisecond_accepts_any_sequence() {
        assert_eq!(
            advance(last(10, 4095), 11, 0),
            Step::Issue {
                timestamp: 11,
                sequence: 0
            }
        );
        assert_eq!(
            advance(last(10, 0), 11, 4095),
            Step::Issue {
                timestamp: 11,
                sequence: 4095
            }
        );
    }

    #[test]
    fn same_millisecond_requires_larger_sequence() {
        assert_eq!(
            advance(last(10, 7), 10, 8),
            Step::Issue {
                timestamp: 10,
                sequence: 8
            }
        );
        assert_eq!(
            advance(last(10, 4095), 10, 0),
            Step::Exhausted { yield_for: 1 }
        );
        assert_eq!(advance(last(10, 7), 10, 7), Step::Exhausted { yield_for: 1 });
    }

    #[test]
    fn regression_is_clamped() {
        assert_eq!(
            advance(last(100, 1), 95, 2),
            Step::Issue {
                timestamp: 100,
                sequence: 2
            }
        );
    }

    #[test]
    fn exhausted_while_behind_waits_past_last() {
        assert_eq!(
            advance(last(100, 4095), 95, 0),
            Step::Exhausted { yield_for: 6 }
        );
    }
}
