//! Setup surface: the calls a configuration makes to assemble a pipeline.
//!
//! ```text
//! ServerConfig ──from_config──► ConfigDsl
//!                                 │  load_addon("htmlpack")
//!                                 │  mount("/lib", "vendor/js")
//!                                 │  on(["*.js", "*.css", "jsoptimize"])
//!                                 ▼
//!                               build() ──► Pipeline
//! ```
//!
//! `on` is variadic: the last argument names the filter, every argument
//! before it is a path pattern, and each pattern becomes its own binding.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::addon::{AddonContext, AddonLoader};
use crate::address::{AssetStore, DirectoryStore, MountTable, StoreOptions};
use crate::config::ServerConfig;
use crate::core::LogicalPath;
use crate::error::{AssetError, Result};
use crate::filter::{
    Filter, FilterChainRegistry, FilterLookup, FilterSpec, PatternSpec, Predicate,
    register_builtins,
};
use crate::logger::Logger;
use crate::pack::{MarkupPacker, TlPacker};
use crate::pipeline::Pipeline;
use crate::template::FunctionTable;
use crate::utils::pattern::NamePattern;

/// One argument of [`ConfigDsl::on`].
#[derive(Clone)]
pub enum DslArg {
    /// A pattern, or a filter key when last.
    Text(String),
    /// Filter keys tried in order. Only valid last.
    Keys(Vec<String>),
    /// A built predicate. Only valid before the last argument.
    Predicate(Predicate),
    /// A built filter. Only valid last.
    Filter(Arc<dyn Filter>),
    /// A script callable. Accepted by the grammar, rejected at setup.
    Callable,
}

impl fmt::Debug for DslArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Keys(k) => f.debug_tuple("Keys").field(k).finish(),
            Self::Predicate(p) => f.debug_tuple("Predicate").field(p).finish(),
            Self::Filter(filter) => f.debug_tuple("Filter").field(&filter.id()).finish(),
            Self::Callable => f.write_str("Callable"),
        }
    }
}

impl From<&str> for DslArg {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl DslArg {
    fn into_pattern(self) -> Result<PatternSpec> {
        match self {
            Self::Text(pattern) => Ok(PatternSpec::Glob(pattern)),
            Self::Predicate(predicate) => Ok(PatternSpec::Predicate(predicate)),
            Self::Callable => Ok(PatternSpec::Callable),
            other => Err(AssetError::configuration(format!(
                "filter.on: {other:?} is not a path pattern"
            ))),
        }
    }

    fn into_filter(self) -> Result<FilterSpec> {
        match self {
            Self::Text(key) => Ok(FilterSpec::key(key)),
            Self::Keys(keys) => Ok(FilterSpec::ByKeyList(keys)),
            Self::Filter(filter) => Ok(FilterSpec::PrebuiltInstance(filter)),
            Self::Callable => Ok(FilterSpec::Callable),
            Self::Predicate(_) => Err(AssetError::configuration(
                "filter.on: the last argument must name a filter",
            )),
        }
    }
}

/// Collects mounts, addons and bindings, then builds a [`Pipeline`].
pub struct ConfigDsl {
    config: Arc<ServerConfig>,
    logger: Arc<dyn Logger>,
    mounts: MountTable,
    registry: FilterChainRegistry,
    functions: FunctionTable,
    packer: Arc<dyn MarkupPacker>,
    addons: AddonLoader,
    loaded: Vec<String>,
}

impl ConfigDsl {
    /// Empty setup: built-in filters, standard template functions, no mounts.
    pub fn new(config: Arc<ServerConfig>, logger: Arc<dyn Logger>) -> Self {
        let mut lookup = FilterLookup::new();
        register_builtins(&mut lookup);
        Self {
            config,
            logger,
            mounts: MountTable::new(),
            registry: FilterChainRegistry::new(lookup),
            functions: FunctionTable::standard(),
            packer: Arc::new(TlPacker),
            addons: AddonLoader::builtin(),
            loaded: Vec::new(),
        }
    }

    /// Replay a parsed configuration file.
    ///
    /// Addons load first so that their filters can be bound. Without any
    /// `[[mount]]` the configuration directory is mounted at `/`.
    pub fn from_config(config: Arc<ServerConfig>, logger: Arc<dyn Logger>) -> Result<Self> {
        let mut dsl = Self::new(Arc::clone(&config), logger);

        for name in &config.addons {
            dsl.load_addon(name)?;
        }

        if config.mounts.is_empty() {
            dsl.mount("/", config.get_root())?;
        }
        for entry in &config.mounts {
            let dir = entry.resolved_dir(config.get_root());
            dsl.mount_excluding(&entry.path, &dir, &entry.exclude)?;
        }

        for rule in &config.filters {
            let mut args: Vec<DslArg> = rule.on.as_slice().iter().map(|p| p.as_str().into()).collect();
            args.push(DslArg::Keys(rule.keys.as_slice().to_vec()));
            dsl.on(args)?;
        }

        Ok(dsl)
    }

    /// Use another markup packer for `htmlpack`. Call before loading addons.
    pub fn with_packer(mut self, packer: Arc<dyn MarkupPacker>) -> Self {
        self.packer = packer;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn addons_mut(&mut self) -> &mut AddonLoader {
        &mut self.addons
    }

    pub fn lookup_mut(&mut self) -> &mut FilterLookup {
        self.registry.lookup_mut()
    }

    pub fn functions_mut(&mut self) -> &mut FunctionTable {
        &mut self.functions
    }

    // ========================================================================
    // mounts
    // ========================================================================

    /// Mount a directory at `server_path`. Relative directories resolve
    /// against the configuration directory.
    pub fn mount(&mut self, server_path: &str, dir: impl AsRef<Path>) -> Result<()> {
        self.mount_excluding(server_path, dir.as_ref(), &[])
    }

    /// [`mount`](Self::mount) with extra name exclusions.
    pub fn mount_excluding(
        &mut self,
        server_path: &str,
        dir: &Path,
        exclude: &[String],
    ) -> Result<()> {
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.config.get_root().join(dir)
        };

        let excludes = if exclude.is_empty() {
            None
        } else {
            let pattern = NamePattern::new(exclude.iter().map(String::as_str)).map_err(|e| {
                AssetError::configuration(format!("mount {server_path}: bad exclude: {e}"))
            })?;
            Some(pattern)
        };

        let options = StoreOptions {
            signature: self.config.cache.signature,
            default_encoding: self.config.server.default_encoding,
            excludes,
        };
        let store = DirectoryStore::new(&dir, options)?;
        self.mount_store(server_path, Arc::new(store))
    }

    /// Mount any store at `server_path`.
    pub fn mount_store(&mut self, server_path: &str, store: Arc<dyn AssetStore>) -> Result<()> {
        let point = parse_server_path(server_path)?;
        self.logger
            .debug("config", &format!("mount {point} -> {}", store.describe()));
        self.mounts.add(point, store);
        Ok(())
    }

    // ========================================================================
    // addons
    // ========================================================================

    /// Install an addon by name. Loading the same addon twice is a no-op.
    pub fn load_addon(&mut self, name: &str) -> Result<()> {
        if self.loaded.iter().any(|n| n == name) {
            return Ok(());
        }

        let mut cx = AddonContext {
            functions: &mut self.functions,
            filters: self.registry.lookup_mut(),
            packer: &self.packer,
            config: &self.config,
            logger: self.logger.as_ref(),
        };
        self.addons.load(name, &mut cx).map_err(|e| match e {
            AssetError::NotFound { .. } => {
                AssetError::configuration(format!("cannot find addon `{name}`"))
            }
            other => other,
        })?;

        self.loaded.push(name.to_string());
        Ok(())
    }

    // ========================================================================
    // filters
    // ========================================================================

    /// `filter.on(pattern..., filter)`.
    pub fn on(&mut self, mut args: Vec<DslArg>) -> Result<()> {
        let Some(last) = args.pop() else {
            return Err(AssetError::configuration("filter.on: no arguments"));
        };
        if args.is_empty() {
            return Err(AssetError::configuration(
                "filter.on: expected at least one pattern before the filter",
            ));
        }

        let filter = last.into_filter()?;
        let patterns = args
            .into_iter()
            .map(DslArg::into_pattern)
            .collect::<Result<Vec<_>>>()?;
        self.bind_all(patterns, filter)
    }

    /// Bind every pattern to the same filter, in order.
    pub fn bind_all(&mut self, patterns: Vec<PatternSpec>, filter: FilterSpec) -> Result<()> {
        let filter = FilterSpec::PrebuiltInstance(self.registry.resolve(filter)?);
        for pattern in patterns {
            let predicate = pattern.resolve()?;
            self.registry.bind(predicate, filter.clone())?;
        }
        Ok(())
    }

    // ========================================================================
    // build
    // ========================================================================

    pub fn build(self) -> Result<Pipeline> {
        if self.mounts.is_empty() {
            return Err(AssetError::configuration("nothing is mounted"));
        }
        Ok(Pipeline::new(
            self.config,
            self.mounts,
            self.registry,
            self.functions,
            self.packer,
            self.logger,
        ))
    }
}

impl fmt::Debug for ConfigDsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigDsl")
            .field("mounts", &self.mounts)
            .field("bindings", &self.registry.bindings().len())
            .field("addons", &self.loaded)
            .finish()
    }
}

fn parse_server_path(server_path: &str) -> Result<LogicalPath> {
    if !server_path.starts_with('/') {
        return Err(AssetError::configuration(format!(
            "mount path `{server_path}` must start with `/`"
        )));
    }
    LogicalPath::parse(server_path).ok_or_else(|| {
        AssetError::configuration(format!("mount path `{server_path}` is not valid"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::MemoryStore;
    use crate::logger::MemoryLogger;
    use std::fs;

    fn dsl(root: &Path) -> ConfigDsl {
        let config = ServerConfig::default().with_root(root);
        ConfigDsl::new(Arc::new(config), Arc::new(MemoryLogger::default()))
    }

    fn render(pipeline: &Pipeline, path: &str) -> Option<String> {
        pipeline
            .render(&LogicalPath::parse(path).unwrap())
            .unwrap()
            .map(|locator| locator.text(None).unwrap())
    }

    mod mounts {
        use super::*;

        #[test]
        fn relative_dirs_resolve_against_root() {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join("web/js")).unwrap();
            fs::write(dir.path().join("web/js/a.js"), "a").unwrap();

            let mut dsl = dsl(dir.path());
            dsl.mount("/static", "web").unwrap();
            let pipeline = dsl.build().unwrap();
            assert_eq!(render(&pipeline, "/static/js/a.js").as_deref(), Some("a"));
            assert_eq!(render(&pipeline, "/web/js/a.js"), None);
        }

        #[test]
        fn longest_prefix_wins() {
            let dir = tempfile::tempdir().unwrap();
            let outer = MemoryStore::new();
            outer.insert("b/x.txt", b"outer".to_vec());
            let inner = MemoryStore::new();
            inner.insert("x.txt", b"inner".to_vec());

            let mut dsl = dsl(dir.path());
            dsl.mount_store("/a", Arc::new(outer)).unwrap();
            dsl.mount_store("/a/b", Arc::new(inner)).unwrap();
            let pipeline = dsl.build().unwrap();
            assert_eq!(render(&pipeline, "/a/b/x.txt").as_deref(), Some("inner"));
        }

        #[test]
        fn bad_mounts_are_configuration_errors() {
            let dir = tempfile::tempdir().unwrap();
            let mut dsl = dsl(dir.path());
            assert!(matches!(
                dsl.mount("lib", "."),
                Err(AssetError::Configuration(_))
            ));
            assert!(matches!(
                dsl.mount("/lib", "does-not-exist"),
                Err(AssetError::Configuration(_))
            ));
            assert!(matches!(dsl.build(), Err(AssetError::Configuration(_))));
        }

        #[test]
        fn excludes_hide_files() {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("a.js"), "a").unwrap();
            fs::write(dir.path().join("a.js.bak"), "old").unwrap();

            let mut dsl = dsl(dir.path());
            dsl.mount_excluding("/", dir.path(), &["*.bak".to_string()])
                .unwrap();
            let pipeline = dsl.build().unwrap();
            assert!(render(&pipeline, "/a.js").is_some());
            assert!(render(&pipeline, "/a.js.bak").is_none());
        }
    }

    mod filters {
        use super::*;

        #[test]
        fn each_pattern_becomes_a_binding() {
            let dir = tempfile::tempdir().unwrap();
            let mut dsl = dsl(dir.path());
            dsl.on(vec!["*.js".into(), "*.css".into(), "ignore".into()])
                .unwrap();
            dsl.on(vec![
                "*.ejs".into(),
                DslArg::Keys(vec!["#missing".into(), "ejs".into()]),
            ])
            .unwrap();

            let bindings = dsl.registry.bindings();
            assert_eq!(bindings.len(), 3);
            assert!(Arc::ptr_eq(bindings[0].filter(), bindings[1].filter()));
            assert_eq!(bindings[2].filter().id(), "std-ejs");
        }

        #[test]
        fn argument_shapes() {
            let dir = tempfile::tempdir().unwrap();
            let mut dsl = dsl(dir.path());
            assert!(dsl.on(vec![]).is_err());
            assert!(dsl.on(vec!["ejs".into()]).is_err());
            assert!(dsl.on(vec![DslArg::Keys(vec![]), "ejs".into()]).is_err());
            assert!(matches!(
                dsl.on(vec![DslArg::Callable, "ejs".into()]),
                Err(AssetError::Configuration(_))
            ));
            assert!(matches!(
                dsl.on(vec!["*.js".into(), DslArg::Callable]),
                Err(AssetError::Configuration(_))
            ));
        }

        #[test]
        fn unknown_key_names_every_key() {
            let dir = tempfile::tempdir().unwrap();
            let mut dsl = dsl(dir.path());
            let err = dsl
                .on(vec![
                    "*.js".into(),
                    DslArg::Keys(vec!["#a".into(), "@b".into(), "c".into()]),
                ])
                .unwrap_err();
            let message = err.to_string();
            for key in ["#a", "@b", "c"] {
                assert!(message.contains(key));
            }
        }
    }

    mod addons {
        use super::*;

        #[test]
        fn load_addon_once() {
            let dir = tempfile::tempdir().unwrap();
            let mut dsl = dsl(dir.path());
            dsl.load_addon("htmlpack").unwrap();
            dsl.load_addon("htmlpack").unwrap();
            assert_eq!(dsl.loaded, ["htmlpack"]);
            assert!(dsl.functions.get("htmlpackString").is_some());
        }

        #[test]
        fn unknown_addon_fails_setup() {
            let dir = tempfile::tempdir().unwrap();
            let mut dsl = dsl(dir.path());
            let err = dsl.load_addon("prototype").unwrap_err();
            assert!(matches!(err, AssetError::Configuration(_)));
            assert!(err.to_string().contains("prototype"));
        }
    }

    mod from_config {
        use super::*;
        use crate::config::test_parse_config;

        #[test]
        fn replays_file() {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir(dir.path().join("views")).unwrap();
            fs::write(
                dir.path().join("views/menu.html"),
                r#"<ul fragment="nav"><li>Home</li></ul>"#,
            )
            .unwrap();
            fs::write(
                dir.path().join("views/menu.js.ejs"),
                "##EJSON\nvar menu=#{htmlpack('menu.html', 'nav')};",
            )
            .unwrap();

            let config = test_parse_config(
                r#"
addons = ["htmlpack"]

[[mount]]
path = "/ui"
dir = "views"

[[filter]]
on = "*.ejs"
use = "ejs"
"#,
            )
            .with_root(dir.path());
            let pipeline = ConfigDsl::from_config(
                Arc::new(config),
                Arc::new(MemoryLogger::default()),
            )
            .unwrap()
            .build()
            .unwrap();

            assert_eq!(
                render(&pipeline, "/ui/menu.js.ejs").as_deref(),
                Some("var menu=['ul','@fragment','nav',['li','Home']];")
            );
        }

        #[test]
        fn no_mounts_serves_root() {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("index.html"), "hi").unwrap();
            let config = ServerConfig::default().with_root(dir.path());
            let pipeline =
                ConfigDsl::from_config(Arc::new(config), Arc::new(MemoryLogger::default()))
                    .unwrap()
                    .build()
                    .unwrap();
            assert_eq!(render(&pipeline, "/index.html").as_deref(), Some("hi"));
        }
    }
}
