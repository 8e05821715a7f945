//! Addons: named bundles of template functions and filters.
//!
//! Configuration lists addons by name (`addons = ["htmlpack"]`); each is
//! installed once while the pipeline is being set up.
//!
//! | Addon      | Provides                                         |
//! |------------|--------------------------------------------------|
//! | `htmlpack` | `htmlpack(resource, locator)`, `htmlpackString`  |

mod htmlpack;

use std::sync::Arc;

use rustc_hash::FxHashMap;

pub use htmlpack::HtmlPackAddon;

use crate::config::ServerConfig;
use crate::error::{AssetError, Missing, Result};
use crate::filter::FilterLookup;
use crate::logger::Logger;
use crate::pack::MarkupPacker;
use crate::template::FunctionTable;

/// Something that extends the pipeline at setup time.
pub trait Addon: Send + Sync {
    fn name(&self) -> &str;

    fn install(&self, cx: &mut AddonContext<'_>) -> Result<()>;
}

/// What an addon may touch while installing.
pub struct AddonContext<'a> {
    pub functions: &'a mut FunctionTable,
    pub filters: &'a mut FilterLookup,
    pub packer: &'a Arc<dyn MarkupPacker>,
    pub config: &'a ServerConfig,
    pub logger: &'a dyn Logger,
}

/// Name to addon table.
#[derive(Default, Clone)]
pub struct AddonLoader {
    addons: FxHashMap<String, Arc<dyn Addon>>,
}

impl AddonLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader knowing the addons shipped with the server.
    pub fn builtin() -> Self {
        let mut loader = Self::new();
        loader.register(HtmlPackAddon);
        loader
    }

    pub fn register(&mut self, addon: impl Addon + 'static) {
        self.addons
            .insert(addon.name().to_string(), Arc::new(addon));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.addons.contains_key(name)
    }

    /// Install the addon called `name`.
    pub fn load(&self, name: &str, cx: &mut AddonContext<'_>) -> Result<()> {
        let Some(addon) = self.addons.get(name) else {
            return Err(AssetError::not_found(Missing::Addon, name, "addons"));
        };
        addon.install(cx)?;
        cx.logger.debug("addon", &format!("installed `{name}`"));
        Ok(())
    }
}

impl std::fmt::Debug for AddonLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.addons.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_set().entries(names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::MemoryLogger;
    use crate::pack::TlPacker;
    use crate::template::RenderScope;
    use serde_json::Value;

    struct Greeting;

    impl Addon for Greeting {
        fn name(&self) -> &str {
            "greeting"
        }

        fn install(&self, cx: &mut AddonContext<'_>) -> Result<()> {
            cx.functions.register(
                "hello",
                |_: &mut RenderScope<'_>, _: Vec<Value>| -> Result<Value> {
                    Ok(Value::String("hello".into()))
                },
            );
            Ok(())
        }
    }

    fn install(loader: &AddonLoader, name: &str, functions: &mut FunctionTable) -> Result<()> {
        let mut filters = FilterLookup::new();
        let packer: Arc<dyn MarkupPacker> = Arc::new(TlPacker);
        let config = ServerConfig::default();
        let logger = MemoryLogger::default();
        let mut cx = AddonContext {
            functions,
            filters: &mut filters,
            packer: &packer,
            config: &config,
            logger: &logger,
        };
        loader.load(name, &mut cx)
    }

    #[test]
    fn registered_addon_installs() {
        let mut loader = AddonLoader::new();
        loader.register(Greeting);
        let mut functions = FunctionTable::new();
        install(&loader, "greeting", &mut functions).unwrap();
        assert!(functions.get("hello").is_some());
    }

    #[test]
    fn unknown_addon_is_not_found() {
        let mut functions = FunctionTable::new();
        let err = install(&AddonLoader::builtin(), "jquery", &mut functions).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("jquery"));
    }

    #[test]
    fn builtin_has_htmlpack() {
        let loader = AddonLoader::builtin();
        assert!(loader.contains("htmlpack"));
        let mut functions = FunctionTable::new();
        install(&loader, "htmlpack", &mut functions).unwrap();
        assert!(functions.get("htmlpack").is_some());
        assert!(functions.get("htmlpackString").is_some());
    }
}
