//! Request pipeline: resolve, select a filter chain, run it, cache the result.
//!
//! # Architecture
//!
//! ```text
//! LogicalPath
//!   │ MountTable::resolve
//!   ▼
//! (AssetPath, Locator) ──► FilterChainRegistry::chain_for
//!   │                          │
//!   │ empty chain              ▼
//!   │                    DependencyCache::get_or_compute(identity, encoding)
//!   │                          │ miss: filter₁ → filter₂ → ... (each may read
//!   │                          │       other resources through FilterContext)
//!   ▼                          ▼
//! Locator                  Option<Locator>
//! ```
//!
//! - [`context`]: per-request state and the filter-side view of it
//! - [`server`]: a swappable pipeline for the serving front ends

mod context;
mod server;

pub use context::{FilterContext, RenderContext};
pub use server::{AssetServer, Method, Reply};

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::address::{AssetPath, Locator, Lookup, MountTable};
use crate::cache::{CacheKey, CacheStats, Cacheable, DependencyCache, Tracking};
use crate::config::{ConfigDsl, ServerConfig};
use crate::core::LogicalPath;
use crate::debug;
use crate::error::{AssetError, Result};
use crate::filter::{FilterChain, FilterChainRegistry};
use crate::freshness::{ContentHash, hash_bytes};
use crate::logger::Logger;
use crate::pack::MarkupPacker;
use crate::template::{FunctionTable, TemplateProgram};

impl Cacheable for Locator {
    fn should_cache(&self) -> bool {
        Locator::should_cache(self)
    }
}

// ============================================================================
// Compiled templates
// ============================================================================

/// Compiled programs keyed by the blake3 hash of their source.
#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: DashMap<ContentHash, Arc<TemplateProgram>>,
}

impl ProgramCache {
    /// The compiled program for `source`, compiling on first sight.
    ///
    /// Sources that fail to compile are not remembered.
    pub fn compile(&self, source: &str, origin: &str) -> Result<Arc<TemplateProgram>> {
        let hash = hash_bytes(source.as_bytes());
        if let Some(program) = self.programs.get(&hash) {
            return Ok(Arc::clone(program.value()));
        }
        let program = Arc::new(TemplateProgram::compile(source, origin)?);
        self.programs.insert(hash, Arc::clone(&program));
        Ok(program)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Everything needed to turn logical paths into content.
///
/// Built once from configuration; read-only afterwards except for its
/// caches.
pub struct Pipeline {
    config: Arc<ServerConfig>,
    mounts: MountTable,
    registry: FilterChainRegistry,
    functions: FunctionTable,
    packer: Arc<dyn MarkupPacker>,
    logger: Arc<dyn Logger>,
    cache: DependencyCache<Option<Locator>>,
    programs: ProgramCache,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("mounts", &self.mounts)
            .field("registry", &self.registry)
            .field("functions", &self.functions)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub(crate) fn new(
        config: Arc<ServerConfig>,
        mounts: MountTable,
        registry: FilterChainRegistry,
        functions: FunctionTable,
        packer: Arc<dyn MarkupPacker>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let cache = DependencyCache::new(config.cache.enabled);
        Self {
            config,
            mounts,
            registry,
            functions,
            packer,
            logger,
            cache,
            programs: ProgramCache::default(),
        }
    }

    /// Build from a loaded configuration: mounts, addons, then filter rules.
    pub fn from_config(config: Arc<ServerConfig>, logger: Arc<dyn Logger>) -> Result<Self> {
        ConfigDsl::from_config(config, logger)?.build()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn logger(&self) -> &dyn Logger {
        &*self.logger
    }

    pub fn mounts(&self) -> &MountTable {
        &self.mounts
    }

    pub fn registry(&self) -> &FilterChainRegistry {
        &self.registry
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn packer(&self) -> &Arc<dyn MarkupPacker> {
        &self.packer
    }

    pub fn programs(&self) -> &ProgramCache {
        &self.programs
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Resolve a top-level request in a fresh context.
    pub fn render(&self, path: &LogicalPath) -> Result<Option<Locator>> {
        self.resolve(path, &mut RenderContext::new())
    }

    /// Resolve `path` and run its filter chain.
    ///
    /// `Ok(None)` when nothing is there or a filter dropped the resource.
    /// Every input touched, including misses, is recorded in `render`.
    pub fn resolve(&self, path: &LogicalPath, render: &mut RenderContext) -> Result<Option<Locator>> {
        let (asset, locator) = match self.mounts.resolve(path) {
            Lookup::Found { path, locator } => (path, locator),
            Lookup::Missing { probe } => {
                if let Some(probe) = probe {
                    render.tracker().record(&probe);
                }
                return Ok(None);
            }
        };

        if render.depth() == 0 {
            render.tracker().set_request(asset.full_path().as_str());
        }

        let chain = self.registry.chain_for(&asset);
        if chain.is_empty() {
            if let Some(probe) = locator.probe() {
                render.tracker().record(probe);
            }
            return Ok(Some(locator));
        }

        if render.is_active(&asset) {
            let origin = render
                .current_path()
                .map_or_else(|| asset.identity().to_string(), |p| p.identity().to_string());
            return Err(AssetError::evaluation(
                origin,
                format!("circular read of `{}`", asset.identity()),
            ));
        }

        let key = CacheKey::new(asset.identity(), locator.encoding());
        let output = self.cache.get_or_compute(&key, render, |render| {
            self.run_chain(&asset, locator, &chain, render)
        })?;
        Ok((*output).clone())
    }

    fn run_chain(
        &self,
        asset: &AssetPath,
        locator: Locator,
        chain: &FilterChain,
        render: &mut RenderContext,
    ) -> Result<Option<Locator>> {
        if let Some(probe) = locator.probe() {
            render.tracker().record(probe);
        }

        render.enter(asset.clone());
        let result = self.apply_chain(asset, locator, chain, render);
        render.leave();
        result
    }

    fn apply_chain(
        &self,
        asset: &AssetPath,
        locator: Locator,
        chain: &FilterChain,
        render: &mut RenderContext,
    ) -> Result<Option<Locator>> {
        let mut current = locator;
        for filter in chain {
            let mut cx = FilterContext::new(self, render, asset);
            match filter.apply(&mut cx, current)? {
                Some(next) => current = next,
                None => {
                    debug!("filter"; "{} dropped {}", filter.id(), asset);
                    return Ok(None);
                }
            }
        }
        current.into_buffered().map(Some)
    }
}
