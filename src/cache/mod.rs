//! Dependency-tracked caching of evaluation results.
//!
//! # Flow
//!
//! ```text
//! get_or_compute(key)
//!   ├─ entry valid?  (every DependencyRecord re-probed)
//!   │     └─ yes: absorb entry deps into caller frame, return value
//!   └─ no: push frame → compute (nested reads record) → pop frame
//!           └─ Ok + cacheable: store new entry    Err: drop entry
//! ```
//!
//! - [`tracker`]: frame stack that records what a computation reads
//! - [`memo`]: the concurrent cache itself

mod memo;
mod tracker;

pub use memo::{CacheEntry, CacheKey, CacheStats, Cacheable, DependencyCache};
pub use tracker::{DependencyRecord, DependencyTracker, Tracking};
