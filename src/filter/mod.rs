//! Filters - transformation stages applied to matched resources.
//!
//! # Module Structure
//!
//! - [`predicate`]: which paths a binding applies to
//! - [`lookup`]: `#id` / `@type` / name resolution to shared instances
//! - [`registry`]: ordered bindings and chain selection
//! - [`builtin`]: `ignore`, `ejs`, `jsoptimize`, `cssoptimize`
//! - [`optimize`]: minifier backends (oxc, lightningcss)
//!
//! A chain runs its filters in binding order. Each filter receives the
//! previous stage's locator and returns the next one, or `None` to end the
//! chain with "not found".

mod builtin;
mod lookup;
mod optimize;
mod predicate;
mod registry;

use std::fmt;

pub use builtin::{CssOptimizeFilter, IgnoreFilter, JsOptimizeFilter, TemplateFilter, register_builtins};
pub use lookup::{FilterFactory, FilterLookup};
pub use optimize::{minify_css, minify_js};
pub use predicate::{PathTest, Predicate};
pub use registry::{FilterBinding, FilterChain, FilterChainRegistry, FilterSpec, PatternSpec};

use crate::address::Locator;
use crate::error::Result;
use crate::pipeline::FilterContext;

/// One transformation stage.
///
/// Instances are shared between every binding and every request that uses
/// them, so they must not keep per-request state.
pub trait Filter: Send + Sync + fmt::Debug {
    /// Identifier shown in summaries and logs.
    fn id(&self) -> &str;

    /// Fully-qualified type key, without the `@` prefix.
    fn type_key(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Transform `source`. `Ok(None)` means the resource does not exist.
    fn apply(&self, cx: &mut FilterContext<'_>, source: Locator) -> Result<Option<Locator>>;
}
