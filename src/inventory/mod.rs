//! Inventory aggregation
//!
//! This module turns a flat list of scanned entries into the breakdowns
//! used by the report: totals, per-extension and per-folder tallies, age
//! buckets, fingerprint groups and the largest and stale file lists.

mod age;
mod index;

pub use age::AgeBucket;
pub use index::{index_by_fingerprint, InventoryIndex, Tally, STALE_AGE_DAYS, STALE_MIN_BYTES};
