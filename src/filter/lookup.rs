//! Filter lookup by key.
//!
//! Keys are addressed by prefix:
//!
//! - `#id`: an identifier, usually an alias of a type key
//! - `@type`: fully-qualified type key, instantiated on first use
//! - anything else: a plain name, usually an alias
//!
//! Aliases are followed until a key with no alias is reached. Every key of
//! one filter therefore resolves to the same shared instance.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::{FxHashMap, FxHashSet};

use super::Filter;
use crate::error::{AssetError, Missing, Result};

/// Constructor for a type-keyed filter.
pub type FilterFactory = fn() -> Arc<dyn Filter>;

/// Key to instance resolution, shared by all bindings.
#[derive(Default)]
pub struct FilterLookup {
    aliases: FxHashMap<String, String>,
    factories: FxHashMap<String, FilterFactory>,
    instances: DashMap<String, Arc<dyn Filter>>,
}

impl FilterLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type key (`@...`) with the factory that builds it.
    pub fn register_type(&mut self, type_key: &str, factory: FilterFactory) {
        self.factories.insert(type_key.to_string(), factory);
    }

    /// Make each of `aliases` resolve to `target`.
    pub fn alias<'a>(&mut self, target: &str, aliases: impl IntoIterator<Item = &'a str>) {
        for alias in aliases {
            self.aliases.insert(alias.to_string(), target.to_string());
        }
    }

    /// Install an instance under `key` directly.
    pub fn set(&self, key: &str, filter: Arc<dyn Filter>) {
        self.instances.insert(key.to_string(), filter);
    }

    /// Resolve one key. `Ok(None)` when nothing is registered under it.
    pub fn lookup(&self, key: &str) -> Result<Option<Arc<dyn Filter>>> {
        let mut name = key;
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        while let Some(target) = self.aliases.get(name) {
            if !visited.insert(name) {
                return Err(AssetError::configuration(format!(
                    "circular filter alias `{key}`"
                )));
            }
            name = target.as_str();
        }

        if let Some(instance) = self.instances.get(name) {
            return Ok(Some(Arc::clone(instance.value())));
        }

        let Some(factory) = self.factories.get(name).filter(|_| name.starts_with('@')) else {
            return Ok(None);
        };
        let instance = self
            .instances
            .entry(name.to_string())
            .or_insert_with(|| factory())
            .value()
            .clone();
        Ok(Some(instance))
    }

    /// Resolve the first key that names a filter.
    ///
    /// Fails naming every attempted key when none does.
    pub fn lookup_any<S: AsRef<str>>(&self, keys: &[S]) -> Result<Arc<dyn Filter>> {
        for key in keys {
            if let Some(filter) = self.lookup(key.as_ref())? {
                return Ok(filter);
            }
        }
        let attempted: Vec<&str> = keys.iter().map(AsRef::as_ref).collect();
        Err(AssetError::not_found(
            Missing::Filter,
            format!("[{}]", attempted.join(",")),
            "filter lookup",
        ))
    }

    /// All keys that can be looked up, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .aliases
            .keys()
            .chain(self.factories.keys())
            .cloned()
            .chain(self.instances.iter().map(|e| e.key().clone()))
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

impl fmt::Debug for FilterLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterLookup")
            .field("aliases", &self.aliases.len())
            .field("types", &self.factories.len())
            .field("instances", &self.instances.len())
            .finish()
    }
}
