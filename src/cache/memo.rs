//! The dependency-tracked memo cache.
//!
//! Entries are immutable `Arc`s; a recompute builds a whole new entry and
//! swaps it in with one map insert, so concurrent readers see either the old
//! entry or the new one. Concurrent misses on one key may both compute; the
//! entry stored last wins and is self-consistent.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::{DependencyRecord, Tracking};
use crate::core::Encoding;
use crate::error::Result;

/// Whether a computed value may be stored.
pub trait Cacheable {
    fn should_cache(&self) -> bool {
        true
    }
}

/// Negative results are cacheable; positive ones defer to the value.
impl<T: Cacheable> Cacheable for Option<T> {
    fn should_cache(&self) -> bool {
        self.as_ref().is_none_or(Cacheable::should_cache)
    }
}

impl Cacheable for String {}

/// Cache key: the fully resolved path (parameters included) and the
/// encoding the result was requested in.
///
/// Output that consulted the requested path is additionally keyed by the
/// request root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    path: String,
    encoding: Option<Encoding>,
    request: Option<Arc<str>>,
}

impl CacheKey {
    pub fn new(path: impl Into<String>, encoding: Option<Encoding>) -> Self {
        Self {
            path: path.into(),
            encoding,
            request: None,
        }
    }

    /// This key, scoped to one request root.
    pub fn for_request(&self, root: &Arc<str>) -> Self {
        Self {
            request: Some(Arc::clone(root)),
            ..self.clone()
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn request(&self) -> Option<&str> {
        self.request.as_deref()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if let Some(encoding) = self.encoding {
            write!(f, " ({encoding})")?;
        }
        if let Some(root) = &self.request {
            write!(f, " for {root}")?;
        }
        Ok(())
    }
}

/// One memoized value with the inputs it was computed from.
#[derive(Debug)]
pub struct CacheEntry<T> {
    value: Arc<T>,
    deps: Vec<DependencyRecord>,
    request: Option<Arc<str>>,
}

impl<T> CacheEntry<T> {
    pub fn value(&self) -> &Arc<T> {
        &self.value
    }

    pub fn deps(&self) -> &[DependencyRecord] {
        &self.deps
    }

    /// The request root the value was built for, if it depends on one.
    pub fn request(&self) -> Option<&str> {
        self.request.as_deref()
    }

    /// Valid while every recorded input keeps its captured signature.
    /// An entry without dependencies is always valid.
    pub fn is_valid(&self) -> bool {
        self.deps.iter().all(DependencyRecord::is_valid)
    }
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {} hits, {} misses",
            self.entries, self.hits, self.misses
        )
    }
}

/// Concurrent memo cache whose entries are invalidated by their inputs.
pub struct DependencyCache<T> {
    entries: DashMap<CacheKey, Arc<CacheEntry<T>>>,
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T> Default for DependencyCache<T> {
    fn default() -> Self {
        Self::new(true)
    }
}

impl<T> fmt::Debug for DependencyCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyCache")
            .field("enabled", &self.enabled)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<T> DependencyCache<T> {
    /// A disabled cache always computes but still propagates dependencies.
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: DashMap::new(),
            enabled,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current entry for `key`, valid or not.
    pub fn entry(&self, key: &CacheKey) -> Option<Arc<CacheEntry<T>>> {
        self.entries.get(key).map(|e| Arc::clone(e.value()))
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<T: Cacheable> DependencyCache<T> {
    /// A valid entry for `key` as seen from request `root`.
    ///
    /// An entry built for this root wins over a request independent one.
    fn lookup(&self, key: &CacheKey, root: Option<&Arc<str>>) -> Option<Arc<CacheEntry<T>>> {
        root.and_then(|root| self.entry(&key.for_request(root)))
            .filter(|entry| entry.is_valid())
            .or_else(|| self.entry(key).filter(|entry| entry.is_valid()))
    }

    /// Return the memoized value for `key`, computing it if needed.
    ///
    /// On a hit the entry's dependencies are added to the caller's current
    /// frame. On a miss `compute` runs in a fresh frame; its records become
    /// the entry's dependencies and also flow to the caller. A value that
    /// consulted the request root is stored for that root only. A failed or
    /// non-cacheable compute leaves no entry behind.
    pub fn get_or_compute<C, F>(&self, key: &CacheKey, cx: &mut C, compute: F) -> Result<Arc<T>>
    where
        C: Tracking + ?Sized,
        F: FnOnce(&mut C) -> Result<T>,
    {
        let root = cx.tracker().request().cloned();
        if self.enabled
            && let Some(entry) = self.lookup(key, root.as_ref())
        {
            self.hits.fetch_add(1, Ordering::Relaxed);
            let tracker = cx.tracker();
            tracker.absorb(&entry.deps);
            if entry.request.is_some() {
                tracker.note_request();
            }
            return Ok(Arc::clone(&entry.value));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        cx.tracker().push();
        let result = compute(cx);
        let (deps, request) = cx.tracker().pop_frame();

        match result {
            Ok(value) => {
                let value = Arc::new(value);
                let stored = match &request {
                    Some(root) => key.for_request(root),
                    None => key.clone(),
                };
                if self.enabled && value.should_cache() {
                    let entry = CacheEntry {
                        value: Arc::clone(&value),
                        deps,
                        request,
                    };
                    self.entries.insert(stored, Arc::new(entry));
                } else {
                    self.entries.remove(&stored);
                }
                Ok(value)
            }
            Err(e) => {
                self.entries.remove(key);
                if let Some(root) = &root {
                    self.entries.remove(&key.for_request(root));
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DependencyTracker;
    use crate::cache::tracker::testing::CounterProbe;
    use crate::error::AssetError;
    use crate::freshness::Probe;
    use std::cell::Cell;

    #[derive(Debug, PartialEq)]
    struct Output(String, bool);

    impl Cacheable for Output {
        fn should_cache(&self) -> bool {
            self.1
        }
    }

    fn key(path: &str) -> CacheKey {
        CacheKey::new(path, None)
    }

    fn dyn_probe(p: &Arc<CounterProbe>) -> Arc<dyn Probe> {
        p.clone()
    }

    #[test]
    fn unchanged_dependencies_hit() {
        let cache = DependencyCache::<String>::default();
        let input = CounterProbe::new("input");
        let calls = Cell::new(0);
        let mut tracker = DependencyTracker::new();

        let compute = |t: &mut DependencyTracker| -> Result<String> {
            calls.set(calls.get() + 1);
            t.record(&dyn_probe(&input));
            Ok(format!("v{}", calls.get()))
        };

        let first = cache.get_or_compute(&key("/r"), &mut tracker, compute).unwrap();
        let second = cache.get_or_compute(&key("/r"), &mut tracker, compute).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn changed_dependency_recomputes() {
        let cache = DependencyCache::<String>::default();
        let input = CounterProbe::new("input");
        let calls = Cell::new(0);
        let mut tracker = DependencyTracker::new();

        let compute = |t: &mut DependencyTracker| -> Result<String> {
            calls.set(calls.get() + 1);
            t.record(&dyn_probe(&input));
            Ok(format!("v{}", calls.get()))
        };

        assert_eq!(*cache.get_or_compute(&key("/r"), &mut tracker, compute).unwrap(), "v1");
        input.bump();
        assert_eq!(*cache.get_or_compute(&key("/r"), &mut tracker, compute).unwrap(), "v2");
        assert_eq!(*cache.get_or_compute(&key("/r"), &mut tracker, compute).unwrap(), "v2");
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn transitive_dependencies_invalidate_outer() {
        let cache = DependencyCache::<String>::default();
        let t_probe = CounterProbe::new("T");
        let r_calls = Cell::new(0);
        let mut tracker = DependencyTracker::new();

        let compute_r = |tracker: &mut DependencyTracker| -> Result<String> {
            r_calls.set(r_calls.get() + 1);
            let s = cache.get_or_compute(&key("/S"), tracker, |tracker| {
                tracker.record(&dyn_probe(&t_probe));
                Ok("s".to_string())
            })?;
            Ok(format!("r({s})#{}", r_calls.get()))
        };

        cache.get_or_compute(&key("/R"), &mut tracker, compute_r).unwrap();
        cache.get_or_compute(&key("/R"), &mut tracker, compute_r).unwrap();
        assert_eq!(r_calls.get(), 1);

        let r_entry = cache.entry(&key("/R")).unwrap();
        assert_eq!(r_entry.deps().len(), 1);
        assert_eq!(r_entry.deps()[0].identity(), "T");

        t_probe.bump();
        let out = cache.get_or_compute(&key("/R"), &mut tracker, compute_r).unwrap();
        assert_eq!(*out, "r(s)#2");
    }

    #[test]
    fn hit_propagates_dependencies_to_caller() {
        let cache = DependencyCache::<String>::default();
        let input = CounterProbe::new("input");
        let mut tracker = DependencyTracker::new();

        let inner = |t: &mut DependencyTracker| -> Result<String> {
            t.record(&dyn_probe(&input));
            Ok("inner".to_string())
        };
        cache.get_or_compute(&key("/inner"), &mut tracker, inner).unwrap();

        // A fresh outer computation hits the inner entry and must still
        // inherit its dependency.
        cache
            .get_or_compute(&key("/outer"), &mut tracker, |t| {
                let v = cache.get_or_compute(&key("/inner"), t, inner)?;
                Ok(format!("outer:{v}"))
            })
            .unwrap();
        assert_eq!(cache.entry(&key("/outer")).unwrap().deps().len(), 1);
    }

    #[test]
    fn failed_compute_is_not_cached() {
        let cache = DependencyCache::<String>::default();
        let calls = Cell::new(0);
        let mut tracker = DependencyTracker::new();

        let failing = |_: &mut DependencyTracker| -> Result<String> {
            calls.set(calls.get() + 1);
            Err(AssetError::evaluation("/r", "boom"))
        };
        assert!(cache.get_or_compute(&key("/r"), &mut tracker, failing).is_err());
        assert!(cache.entry(&key("/r")).is_none());
        assert!(cache.get_or_compute(&key("/r"), &mut tracker, failing).is_err());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn failure_removes_stale_entry() {
        let cache = DependencyCache::<String>::default();
        let input = CounterProbe::new("input");
        let mut tracker = DependencyTracker::new();

        cache
            .get_or_compute(&key("/r"), &mut tracker, |t| {
                t.record(&dyn_probe(&input));
                Ok("ok".to_string())
            })
            .unwrap();
        input.bump();
        let result = cache.get_or_compute(&key("/r"), &mut tracker, |_| {
            Err(AssetError::evaluation("/r", "boom"))
        });
        assert!(result.is_err());
        assert!(cache.entry(&key("/r")).is_none());
    }

    #[test]
    fn no_dependencies_is_always_valid() {
        let cache = DependencyCache::<String>::default();
        let calls = Cell::new(0);
        let mut tracker = DependencyTracker::new();
        let compute = |_: &mut DependencyTracker| -> Result<String> {
            calls.set(calls.get() + 1);
            Ok("const".to_string())
        };
        for _ in 0..3 {
            cache.get_or_compute(&key("/c"), &mut tracker, compute).unwrap();
        }
        assert_eq!(calls.get(), 1);
        assert!(cache.entry(&key("/c")).unwrap().is_valid());
    }

    #[test]
    fn non_cacheable_values_are_not_stored() {
        let cache = DependencyCache::<Output>::default();
        let mut tracker = DependencyTracker::new();
        let out = cache
            .get_or_compute(&key("/v"), &mut tracker, |_| Ok(Output("x".into(), false)))
            .unwrap();
        assert_eq!(*out, Output("x".into(), false));
        assert!(cache.entry(&key("/v")).is_none());
    }

    #[test]
    fn negative_results_are_cached() {
        let cache = DependencyCache::<Option<Output>>::default();
        let mut tracker = DependencyTracker::new();
        cache.get_or_compute(&key("/none"), &mut tracker, |_| Ok(None)).unwrap();
        assert!(cache.entry(&key("/none")).is_some());
    }

    #[test]
    fn disabled_cache_computes_and_propagates() {
        let cache = DependencyCache::<String>::new(false);
        let input = CounterProbe::new("input");
        let calls = Cell::new(0);
        let mut tracker = DependencyTracker::new();

        tracker.push();
        for _ in 0..2 {
            cache
                .get_or_compute(&key("/d"), &mut tracker, |t| {
                    calls.set(calls.get() + 1);
                    t.record(&dyn_probe(&input));
                    Ok("d".to_string())
                })
                .unwrap();
        }
        assert_eq!(calls.get(), 2);
        assert_eq!(tracker.pop().len(), 1);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn request_dependent_values_are_kept_per_root() {
        let cache = DependencyCache::<String>::default();
        let calls = Cell::new(0);
        let compute = |t: &mut DependencyTracker| -> Result<String> {
            calls.set(calls.get() + 1);
            t.note_request();
            Ok(format!("for {}", t.request().map_or("-", |r| &**r)))
        };

        let mut a = DependencyTracker::new();
        a.set_request("/a/index.ejs");
        let mut b = DependencyTracker::new();
        b.set_request("/b/index.ejs");

        assert_eq!(*cache.get_or_compute(&key("/part"), &mut a, compute).unwrap(), "for /a/index.ejs");
        assert_eq!(*cache.get_or_compute(&key("/part"), &mut b, compute).unwrap(), "for /b/index.ejs");
        assert_eq!(*cache.get_or_compute(&key("/part"), &mut a, compute).unwrap(), "for /a/index.ejs");
        assert_eq!(calls.get(), 2);
        assert!(cache.entry(&key("/part")).is_none());

        let root: Arc<str> = Arc::from("/a/index.ejs");
        let scoped = cache.entry(&key("/part").for_request(&root)).unwrap();
        assert_eq!(scoped.request(), Some("/a/index.ejs"));
    }

    #[test]
    fn request_independent_values_are_shared() {
        let cache = DependencyCache::<String>::default();
        let calls = Cell::new(0);
        let compute = |_: &mut DependencyTracker| -> Result<String> {
            calls.set(calls.get() + 1);
            Ok("same".to_string())
        };

        for root in ["/a.ejs", "/b.ejs"] {
            let mut tracker = DependencyTracker::new();
            tracker.set_request(root);
            cache.get_or_compute(&key("/part"), &mut tracker, compute).unwrap();
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn keys_distinguish_encoding() {
        let utf8 = CacheKey::new("/a.txt", Some(Encoding::Utf8));
        let latin = CacheKey::new("/a.txt", Some(Encoding::Latin1));
        assert_ne!(utf8, latin);
        assert_eq!(utf8.to_string(), "/a.txt (UTF-8)");
    }

    #[test]
    fn invalidate_and_clear() {
        let cache = DependencyCache::<String>::default();
        let mut tracker = DependencyTracker::new();
        for path in ["/a", "/b"] {
            cache
                .get_or_compute(&key(path), &mut tracker, |_| Ok(path.to_string()))
                .unwrap();
        }
        assert!(cache.invalidate(&key("/a")));
        assert!(!cache.invalidate(&key("/a")));
        assert_eq!(cache.stats().entries, 1);
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }
}
