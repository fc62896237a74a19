//! # ferroflake
//!
//! Time-ordered, 64-bit Snowflake-style identifiers that can be generated by
//! many processes at once without a coordination service.
//!
//! ```text
//!  Bit Index:  63           63 62            22 21            12 11             0
//!              +--------------+----------------+----------------+---------------+
//!  Field:      | reserved (1) | timestamp (41) | worker ID (10) | sequence (12) |
//!              +--------------+----------------+----------------+---------------+
//!              |<----------- MSB ---------- 64 bits ----------- LSB ----------->|
//! ```
//!
//! - The **timestamp** counts milliseconds since [`FLAKE_EPOCH`] (or a custom
//!   epoch chosen when the clock is built). 41 bits last roughly 69 years.
//! - The **worker id** is derived once per process from a random node
//!   component and the process/thread identifiers (see [`WorkerId`]), or
//!   assigned explicitly.
//! - The **sequence** disambiguates IDs minted within the same millisecond.
//!
//! ## Example
//!
//! ```
//! use ferroflake::{FlakeGenerator, LockFlakeGenerator, MonotonicClock, WorkerId};
//!
//! let generator = LockFlakeGenerator::new(WorkerId::process(), MonotonicClock::default());
//!
//! let a = generator.next_id().unwrap();
//! let b = generator.next_id().unwrap();
//! assert!(b > a);
//!
//! let parsed = generator.parse(b);
//! assert_eq!(parsed.worker_id, WorkerId::process().get());
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
mod generator;
mod id;
mod rand;
mod time;
mod worker;

pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::rand::*;
pub use crate::time::*;
pub use crate::worker::*;
