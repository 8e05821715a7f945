//! Freshness detection for cache dependencies.
//!
//! - [`hash`]: blake3 content hashes (signatures and etags)
//! - [`signature`]: snapshots of inputs and the probes that re-take them

mod hash;
mod signature;

pub use hash::{ContentHash, compute_file_hash, hash_bytes};
pub use signature::{FileProbe, Probe, Signature, SignatureMode, file_signature};
