//! Backing stores behind mount points.
//!
//! - [`DirectoryStore`]: a physical directory, with name exclusions
//! - [`MemoryStore`]: in-memory resources, versioned for invalidation

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use jwalk::WalkDir;

use super::{AssetPath, Locator};
use crate::core::Encoding;
use crate::error::{AssetError, Result};
use crate::freshness::{FileProbe, Probe, Signature, SignatureMode};
use crate::utils::mime;
use crate::utils::pattern::NamePattern;

/// Result of asking a store for one path.
#[derive(Debug)]
pub enum StoreLookup {
    Found(Locator),
    /// Not there. The probe, when present, reports the path appearing later.
    Missing(Option<Arc<dyn Probe>>),
}

/// A physical or virtual tree of resources.
pub trait AssetStore: Send + Sync + fmt::Debug {
    /// Look up the remainder of `path` below this store's mount point.
    fn locate(&self, path: &AssetPath) -> StoreLookup;

    /// Short human-readable description for summaries.
    fn describe(&self) -> String;

    /// Every resource in the store, as slash-separated relative paths.
    fn list(&self) -> Vec<String>;
}

// ============================================================================
// DirectoryStore
// ============================================================================

/// Settings shared by directory stores.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    pub signature: SignatureMode,
    pub default_encoding: Encoding,
    /// User exclusions, on top of [`NamePattern::default_excludes`].
    pub excludes: Option<NamePattern>,
}

/// Serves files from a directory.
#[derive(Debug)]
pub struct DirectoryStore {
    root: PathBuf,
    options: StoreOptions,
}

impl DirectoryStore {
    /// Open a directory. The directory must exist.
    pub fn new(dir: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let dir = dir.as_ref();
        let root = dir.canonicalize().map_err(|e| {
            AssetError::configuration(format!("cannot mount `{}`: {e}", dir.display()))
        })?;
        if !root.is_dir() {
            return Err(AssetError::configuration(format!(
                "cannot mount `{}`: not a directory",
                dir.display()
            )));
        }
        Ok(Self { root, options })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_excluded(&self, name: &str) -> bool {
        NamePattern::default_excludes().matches(name)
            || self.options.excludes.as_ref().is_some_and(|p| p.matches(name))
    }
}

impl AssetStore for DirectoryStore {
    fn locate(&self, path: &AssetPath) -> StoreLookup {
        if path.remainder().iter().any(|s| self.is_excluded(s)) {
            return StoreLookup::Missing(None);
        }

        let physical = path
            .remainder()
            .iter()
            .fold(self.root.clone(), |acc, segment| acc.join(segment));
        let probe: Arc<dyn Probe> = Arc::new(FileProbe::new(&physical, self.options.signature));

        // Symlinks and case-folding filesystems can make a different literal path
        // reach a file; only the exact spelling is served.
        let exact = physical
            .canonicalize()
            .is_ok_and(|canonical| canonical == physical);
        if !exact || !physical.is_file() {
            return StoreLookup::Missing(Some(probe));
        }

        let content_type = mime::from_path(&physical);
        let encoding = mime::is_text(content_type).then_some(self.options.default_encoding);
        let locator = Locator::file(path.full_path().as_str(), physical)
            .with_content_type(content_type)
            .with_encoding(encoding)
            .with_probe(probe);
        StoreLookup::Found(locator)
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn list(&self) -> Vec<String> {
        WalkDir::new(&self.root)
            .skip_hidden(false)
            .sort(true)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let path = e.path();
                let relative = path.strip_prefix(&self.root).ok()?;
                let segments: Vec<&str> = relative
                    .components()
                    .map(|c| c.as_os_str().to_str())
                    .collect::<Option<_>>()?;
                (!segments.iter().any(|s| self.is_excluded(s))).then(|| segments.join("/"))
            })
            .collect()
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

#[derive(Debug, Clone)]
struct MemoryEntry {
    bytes: Arc<[u8]>,
    version: u64,
}

/// In-memory resources keyed by their path below the mount point.
///
/// Cloning shares the same contents, so a clone kept by the caller can
/// update resources after the store has been mounted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, MemoryEntry>>,
    counter: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a resource. `path` is relative to the mount point.
    pub fn insert(&self, path: &str, bytes: impl Into<Arc<[u8]>>) {
        let version = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.entries.insert(
            key(path),
            MemoryEntry {
                bytes: bytes.into(),
                version,
            },
        );
    }

    pub fn remove(&self, path: &str) -> bool {
        self.entries.remove(&key(path)).is_some()
    }

    fn probe(&self, key: String) -> Arc<dyn Probe> {
        Arc::new(MemoryProbe {
            identity: format!("memory:{:p}:{key}", Arc::as_ptr(&self.entries)),
            key,
            entries: self.entries.clone(),
        })
    }
}

fn key(path: &str) -> String {
    path.trim_matches('/').to_string()
}

impl AssetStore for MemoryStore {
    fn locate(&self, path: &AssetPath) -> StoreLookup {
        let key = path.remainder().join("/");
        let probe = self.probe(key.clone());
        match self.entries.get(&key) {
            Some(entry) => {
                let locator = Locator::buffer(path.full_path().as_str(), entry.bytes.clone())
                    .with_probe(probe);
                let text = mime::is_text(locator.content_type());
                StoreLookup::Found(locator.with_encoding(text.then_some(Encoding::Utf8)))
            }
            None => StoreLookup::Missing(Some(probe)),
        }
    }

    fn describe(&self) -> String {
        format!("memory ({} entries)", self.entries.len())
    }

    fn list(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

/// Reports the version of one memory entry.
#[derive(Debug)]
struct MemoryProbe {
    identity: String,
    key: String,
    entries: Arc<DashMap<String, MemoryEntry>>,
}

impl Probe for MemoryProbe {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn signature(&self) -> Signature {
        self.entries
            .get(&self.key)
            .map_or(Signature::Missing, |e| Signature::Version(e.version))
    }
}
