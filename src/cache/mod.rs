//! Cache module for storing API responses with a time-to-live
//!
//! This module provides a TTL cache layered over any `KeyValueStore`. Entries
//! carry their write time and TTL; reads of stale or unreadable entries come
//! back as a miss so cache trouble never blocks the caller, while failed
//! writes are reported.

mod clock;
mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ttl::{CacheError, TtlCache};
