//! Ordered filter bindings and chain selection.

use std::fmt;
use std::sync::Arc;

use super::{Filter, FilterLookup, Predicate};
use crate::address::AssetPath;
use crate::error::{AssetError, Result};

/// How a binding names its filter.
#[derive(Clone)]
pub enum FilterSpec {
    /// Lookup keys tried in order; the first that resolves wins.
    ByKeyList(Vec<String>),
    /// An already built filter, used as is.
    PrebuiltInstance(Arc<dyn Filter>),
    /// Script callables. Not supported; rejected at setup.
    Callable,
}

impl FilterSpec {
    /// A single lookup key.
    pub fn key(key: impl Into<String>) -> Self {
        Self::ByKeyList(vec![key.into()])
    }

    pub fn keys<S: Into<String>>(keys: impl IntoIterator<Item = S>) -> Self {
        Self::ByKeyList(keys.into_iter().map(Into::into).collect())
    }
}

impl fmt::Debug for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByKeyList(keys) => f.debug_tuple("ByKeyList").field(keys).finish(),
            Self::PrebuiltInstance(filter) => {
                f.debug_tuple("PrebuiltInstance").field(&filter.id()).finish()
            }
            Self::Callable => f.write_str("Callable"),
        }
    }
}

/// How a binding names the paths it applies to.
#[derive(Debug, Clone)]
pub enum PatternSpec {
    /// A pattern string, see [`Predicate::build`].
    Glob(String),
    /// An already built predicate.
    Predicate(Predicate),
    /// Script callables. Not supported; rejected at setup.
    Callable,
}

impl PatternSpec {
    pub fn resolve(self) -> Result<Predicate> {
        match self {
            Self::Glob(pattern) => Predicate::build(&pattern),
            Self::Predicate(predicate) => Ok(predicate),
            Self::Callable => Err(AssetError::configuration(
                "callable patterns are not yet implemented",
            )),
        }
    }
}

impl From<&str> for PatternSpec {
    fn from(pattern: &str) -> Self {
        Self::Glob(pattern.to_string())
    }
}

/// One (predicate, filter) pair.
#[derive(Debug, Clone)]
pub struct FilterBinding {
    predicate: Predicate,
    filter: Arc<dyn Filter>,
}

impl FilterBinding {
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn filter(&self) -> &Arc<dyn Filter> {
        &self.filter
    }
}

/// Filters selected for one path, in binding order.
pub type FilterChain = Vec<Arc<dyn Filter>>;

/// Lookup table plus bindings in registration order.
///
/// Built during setup, read-only while serving.
#[derive(Debug, Default)]
pub struct FilterChainRegistry {
    lookup: FilterLookup,
    bindings: Vec<FilterBinding>,
}

impl FilterChainRegistry {
    pub fn new(lookup: FilterLookup) -> Self {
        Self {
            lookup,
            bindings: Vec::new(),
        }
    }

    pub fn lookup(&self) -> &FilterLookup {
        &self.lookup
    }

    pub fn lookup_mut(&mut self) -> &mut FilterLookup {
        &mut self.lookup
    }

    /// Resolve a filter spec to a shared instance.
    pub fn resolve(&self, spec: FilterSpec) -> Result<Arc<dyn Filter>> {
        match spec {
            FilterSpec::ByKeyList(keys) if keys.is_empty() => {
                Err(AssetError::configuration("empty filter key list"))
            }
            FilterSpec::ByKeyList(keys) => self.lookup.lookup_any(keys.as_slice()),
            FilterSpec::PrebuiltInstance(filter) => Ok(filter),
            FilterSpec::Callable => Err(AssetError::configuration(
                "callable filters are not yet implemented",
            )),
        }
    }

    /// Append a binding.
    pub fn bind(&mut self, predicate: Predicate, spec: FilterSpec) -> Result<()> {
        let filter = self.resolve(spec)?;
        self.bindings.push(FilterBinding { predicate, filter });
        Ok(())
    }

    /// Every filter whose predicate matches, in registration order.
    pub fn chain_for(&self, path: &AssetPath) -> FilterChain {
        self.bindings
            .iter()
            .filter(|b| b.predicate.matches(path))
            .map(|b| Arc::clone(&b.filter))
            .collect()
    }

    pub fn bindings(&self) -> &[FilterBinding] {
        &self.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Locator;
    use crate::core::LogicalPath;
    use crate::filter::PathTest;
    use crate::pipeline::FilterContext;

    #[derive(Debug)]
    struct Named(&'static str);

    impl Filter for Named {
        fn id(&self) -> &str {
            self.0
        }

        fn apply(&self, _: &mut FilterContext<'_>, source: Locator) -> Result<Option<Locator>> {
            Ok(Some(source))
        }
    }

    #[derive(Debug)]
    struct Always;

    impl PathTest for Always {
        fn matches(&self, _: &AssetPath) -> bool {
            true
        }
    }

    fn path(full: &str) -> AssetPath {
        let logical = LogicalPath::parse(full).unwrap();
        AssetPath::new(LogicalPath::root(), logical.segments()).unwrap()
    }

    fn ids(chain: &FilterChain) -> Vec<&str> {
        chain.iter().map(|f| f.id()).collect()
    }

    #[test]
    fn chain_follows_registration_order() {
        let mut registry = FilterChainRegistry::default();
        let b1: Arc<dyn Filter> = Arc::new(Named("b1"));
        let b2: Arc<dyn Filter> = Arc::new(Named("b2"));
        let b3: Arc<dyn Filter> = Arc::new(Named("b3"));

        registry
            .bind(Predicate::custom(Always), FilterSpec::PrebuiltInstance(b1))
            .unwrap();
        registry
            .bind(Predicate::build("/lib/**/*.js").unwrap(), FilterSpec::PrebuiltInstance(b2))
            .unwrap();
        registry
            .bind(Predicate::build("a.js").unwrap(), FilterSpec::PrebuiltInstance(b3))
            .unwrap();

        assert_eq!(ids(&registry.chain_for(&path("/lib/x/a.js"))), ["b1", "b2", "b3"]);
        assert_eq!(ids(&registry.chain_for(&path("/lib/b.js"))), ["b1", "b2"]);
        assert_eq!(ids(&registry.chain_for(&path("/a.js"))), ["b1", "b3"]);
    }

    #[test]
    fn no_match_is_empty_chain() {
        let mut registry = FilterChainRegistry::default();
        registry
            .bind(
                Predicate::build("*.css").unwrap(),
                FilterSpec::PrebuiltInstance(Arc::new(Named("css"))),
            )
            .unwrap();
        assert!(registry.chain_for(&path("/a.js")).is_empty());
    }

    #[test]
    fn key_list_resolves_first_found() {
        let registry = FilterChainRegistry::default();
        registry.lookup().set("#second", Arc::new(Named("second")));
        let filter = registry
            .resolve(FilterSpec::keys(["#first", "#second"]))
            .unwrap();
        assert_eq!(filter.id(), "second");
    }

    #[test]
    fn same_key_binds_same_instance() {
        let mut registry = FilterChainRegistry::default();
        registry.lookup().set("#shared", Arc::new(Named("shared")));
        for pattern in ["*.js", "*.css"] {
            registry
                .bind(Predicate::build(pattern).unwrap(), FilterSpec::key("#shared"))
                .unwrap();
        }
        let bindings = registry.bindings();
        assert!(Arc::ptr_eq(bindings[0].filter(), bindings[1].filter()));
    }

    #[test]
    fn unresolvable_specs() {
        let mut registry = FilterChainRegistry::default();
        let err = registry
            .bind(Predicate::build("*.js").unwrap(), FilterSpec::keys(["x", "y"]))
            .unwrap_err();
        assert!(err.to_string().contains("[x,y]"));

        assert!(matches!(
            registry.resolve(FilterSpec::Callable),
            Err(AssetError::Configuration(_))
        ));
        assert!(matches!(
            PatternSpec::Callable.resolve(),
            Err(AssetError::Configuration(_))
        ));
        assert!(registry.bindings().is_empty());
    }
}
