//! Mount table: logical prefixes bound to stores.

use std::sync::Arc;

use super::{AssetPath, AssetStore, Locator, StoreLookup};
use crate::core::LogicalPath;
use crate::freshness::Probe;

/// One mount point.
#[derive(Debug, Clone)]
pub struct Mount {
    point: LogicalPath,
    store: Arc<dyn AssetStore>,
}

impl Mount {
    pub fn point(&self) -> &LogicalPath {
        &self.point
    }

    pub fn store(&self) -> &Arc<dyn AssetStore> {
        &self.store
    }
}

/// Outcome of resolving a logical path.
#[derive(Debug)]
pub enum Lookup {
    Found { path: AssetPath, locator: Locator },
    /// No resource. `probe` reports the resource appearing later, if known.
    Missing { probe: Option<Arc<dyn Probe>> },
}

/// Mounts in registration order.
///
/// Populated during setup, read-only while serving.
#[derive(Debug, Default, Clone)]
pub struct MountTable {
    mounts: Vec<Mount>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, point: LogicalPath, store: Arc<dyn AssetStore>) {
        self.mounts.push(Mount { point, store });
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mount> {
        self.mounts.iter()
    }

    /// The mount with the longest prefix of `path`, by whole segments.
    ///
    /// Ties go to the mount registered first.
    pub fn find(&self, path: &LogicalPath) -> Option<(&Mount, usize)> {
        let segments: Vec<&str> = path.segments().collect();
        let mut best: Option<(&Mount, usize)> = None;

        for mount in &self.mounts {
            let prefix: Vec<&str> = mount.point.segments().collect();
            let matches = prefix.len() <= segments.len()
                && prefix.iter().zip(&segments).all(|(a, b)| a == b);
            if matches && best.is_none_or(|(_, len)| prefix.len() > len) {
                best = Some((mount, prefix.len()));
            }
        }
        best
    }

    /// Resolve a normalized logical path to a resource.
    ///
    /// Paths with invalid segments and paths outside every mount are missing.
    pub fn resolve(&self, path: &LogicalPath) -> Lookup {
        let Some((mount, depth)) = self.find(path) else {
            return Lookup::Missing { probe: None };
        };

        let Some(asset) = AssetPath::new(mount.point.clone(), path.segments().skip(depth)) else {
            return Lookup::Missing { probe: None };
        };

        match mount.store.locate(&asset) {
            StoreLookup::Found(locator) => Lookup::Found {
                path: asset,
                locator,
            },
            StoreLookup::Missing(probe) => Lookup::Missing { probe },
        }
    }
}
