//! Change signatures for physical and virtual inputs.
//!
//! A [`Signature`] is a comparable snapshot of an input. A [`Probe`] knows how
//! to take a fresh snapshot of one input so that a recorded signature can be
//! re-validated later.
//!
//! # Modes
//!
//! - **mtime**: modification time plus length, cheap (one `stat`)
//! - **content**: blake3 hash of the bytes, immune to coarse timestamps

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::hash::{ContentHash, compute_file_hash};

/// Comparable snapshot of one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signature {
    /// The input did not exist when captured.
    Missing,
    /// Filesystem stamp.
    Stamp {
        modified: Option<SystemTime>,
        len: u64,
    },
    /// Content hash.
    Content(ContentHash),
    /// Monotonic version counter of an in-memory input.
    Version(u64),
}

impl Signature {
    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// How file signatures are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureMode {
    #[default]
    Mtime,
    Content,
}

/// Source of live signatures for one input.
pub trait Probe: Send + Sync + fmt::Debug {
    /// Stable identity of the input (used to de-duplicate records).
    fn identity(&self) -> &str;

    /// Take a fresh signature.
    fn signature(&self) -> Signature;
}

/// Probe for a physical file (which may not exist).
#[derive(Debug, Clone)]
pub struct FileProbe {
    path: PathBuf,
    identity: String,
    mode: SignatureMode,
}

impl FileProbe {
    pub fn new(path: impl Into<PathBuf>, mode: SignatureMode) -> Self {
        let path = path.into();
        let identity = format!("file:{}", path.display());
        Self {
            path,
            identity,
            mode,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Probe for FileProbe {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn signature(&self) -> Signature {
        file_signature(&self.path, self.mode)
    }
}

/// Take the signature of a file.
pub fn file_signature(path: &Path, mode: SignatureMode) -> Signature {
    let Ok(meta) = path.metadata() else {
        return Signature::Missing;
    };
    if !meta.is_file() {
        return Signature::Missing;
    }
    match mode {
        SignatureMode::Mtime => Signature::Stamp {
            modified: meta.modified().ok(),
            len: meta.len(),
        },
        SignatureMode::Content => Signature::Content(compute_file_hash(path)),
    }
}
