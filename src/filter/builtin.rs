//! Built-in filters.
//!
//! | Filter              | Keys                            |
//! |---------------------|---------------------------------|
//! | [`IgnoreFilter`]    | `ignore`, `#std-ignore`         |
//! | [`TemplateFilter`]  | `ejs`, `#std-ejs`               |
//! | [`JsOptimizeFilter`]  | `jsoptimize`, `#std-jsoptimize` |
//! | [`CssOptimizeFilter`] | `cssoptimize`, `#std-cssoptimize` |
//!
//! Each is also reachable by its `@type` key.

use std::sync::Arc;

use super::{Filter, FilterLookup, minify_css, minify_js};
use crate::address::Locator;
use crate::error::Result;
use crate::pipeline::FilterContext;

/// Hides matching resources: they resolve as not found.
#[derive(Debug, Default)]
pub struct IgnoreFilter;

impl Filter for IgnoreFilter {
    fn id(&self) -> &str {
        "std-ignore"
    }

    fn apply(&self, _: &mut FilterContext<'_>, _: Locator) -> Result<Option<Locator>> {
        Ok(None)
    }
}

/// Evaluates the resource as a template.
///
/// A source without any computed fragment is passed on unchanged.
#[derive(Debug, Default)]
pub struct TemplateFilter;

impl Filter for TemplateFilter {
    fn id(&self) -> &str {
        "std-ejs"
    }

    fn apply(&self, cx: &mut FilterContext<'_>, source: Locator) -> Result<Option<Locator>> {
        let text = source.text(None)?;
        let origin = cx.path().identity().to_string();
        match cx.render_template(&text, &origin)? {
            Some(output) => Ok(Some(source.derive_text(&output))),
            None => Ok(Some(source)),
        }
    }
}

/// Minifies JavaScript with oxc.
#[derive(Debug, Default)]
pub struct JsOptimizeFilter;

impl Filter for JsOptimizeFilter {
    fn id(&self) -> &str {
        "std-jsoptimize"
    }

    fn apply(&self, cx: &mut FilterContext<'_>, source: Locator) -> Result<Option<Locator>> {
        optimize(cx, source, "script", minify_js)
    }
}

/// Minifies stylesheets with lightningcss.
#[derive(Debug, Default)]
pub struct CssOptimizeFilter;

impl Filter for CssOptimizeFilter {
    fn id(&self) -> &str {
        "std-cssoptimize"
    }

    fn apply(&self, cx: &mut FilterContext<'_>, source: Locator) -> Result<Option<Locator>> {
        optimize(cx, source, "stylesheet", minify_css)
    }
}

/// Minified content, or the source itself when optimizing is off or the
/// minifier rejects the input.
fn optimize(
    cx: &mut FilterContext<'_>,
    source: Locator,
    kind: &str,
    minify: fn(&str) -> Option<String>,
) -> Result<Option<Locator>> {
    if cx.config().server.no_optimize {
        return Ok(Some(source));
    }

    let text = source.text(None)?;
    match minify(&text) {
        Some(minified) => Ok(Some(source.derive_text(&minified))),
        None => {
            cx.logger().warn(
                "optimize",
                &format!("{kind} `{}` did not parse, serving it as is", source.name()),
            );
            Ok(Some(source))
        }
    }
}

// ============================================================================
// Registration
// ============================================================================

fn make<F: Filter + Default + 'static>() -> Arc<dyn Filter> {
    Arc::new(F::default())
}

fn register<F: Filter + Default + 'static>(lookup: &mut FilterLookup, keys: [&str; 2]) {
    let type_key = format!("@{}", std::any::type_name::<F>());
    lookup.register_type(&type_key, make::<F>);
    lookup.alias(&type_key, keys);
}

/// Register the built-in filters under their type keys and aliases.
pub fn register_builtins(lookup: &mut FilterLookup) {
    register::<IgnoreFilter>(lookup, ["#std-ignore", "ignore"]);
    register::<TemplateFilter>(lookup, ["#std-ejs", "ejs"]);
    register::<JsOptimizeFilter>(lookup, ["#std-jsoptimize", "jsoptimize"]);
    register::<CssOptimizeFilter>(lookup, ["#std-cssoptimize", "cssoptimize"]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> FilterLookup {
        let mut lookup = FilterLookup::new();
        register_builtins(&mut lookup);
        lookup
    }

    #[test]
    fn every_key_yields_one_instance() {
        let lookup = lookup();
        for (name, id) in [
            ("ignore", "#std-ignore"),
            ("ejs", "#std-ejs"),
            ("jsoptimize", "#std-jsoptimize"),
            ("cssoptimize", "#std-cssoptimize"),
        ] {
            let by_name = lookup.lookup(name).unwrap().unwrap();
            let by_id = lookup.lookup(id).unwrap().unwrap();
            let by_type = lookup
                .lookup(&format!("@{}", by_name.type_key()))
                .unwrap()
                .unwrap();
            assert!(Arc::ptr_eq(&by_name, &by_id), "{name}");
            assert!(Arc::ptr_eq(&by_name, &by_type), "{name}");
            assert_eq!(format!("#{}", by_name.id()), id);
        }
    }

    #[test]
    fn type_key_names_the_struct() {
        let filter = lookup().lookup("ejs").unwrap().unwrap();
        assert!(filter.type_key().ends_with("TemplateFilter"));
    }
}
