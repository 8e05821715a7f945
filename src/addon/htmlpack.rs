//! `htmlpack`: packed markup fragments for templates.
//!
//! ```text
//! htmlpack('views/menu.html', 'main')   -> ['ul#main',['li','Home'],...]
//! htmlpack('menu.html', '', {encoding: 'latin1'})
//! htmlpackString('<b>x</b>')             -> ['b','x']
//! ```
//!
//! An empty or null locator selects the first child.

use std::sync::Arc;

use serde_json::Value;

use super::{Addon, AddonContext};
use crate::error::Result;
use crate::pack::{Addressing, MarkupPacker, pack_fragment};
use crate::template::{
    RenderScope, TemplateFunction, encoding_option, optional_string_arg, read_existing, string_arg,
};

/// Source name used in errors for markup passed as a string.
const LITERAL_SOURCE: &str = "literal html fragment";

#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlPackAddon;

impl Addon for HtmlPackAddon {
    fn name(&self) -> &str {
        "htmlpack"
    }

    fn install(&self, cx: &mut AddonContext<'_>) -> Result<()> {
        for input in [Input::Resource, Input::Literal] {
            let function = Pack {
                packer: Arc::clone(cx.packer),
                addressing: cx.config.packer.addressing,
                attribute: cx.config.packer.attribute.clone(),
                input,
            };
            cx.functions.register(function.name(), function);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Input {
    /// First argument is a path relative to the evaluating resource.
    Resource,
    /// First argument is the markup itself.
    Literal,
}

struct Pack {
    packer: Arc<dyn MarkupPacker>,
    addressing: Addressing,
    attribute: String,
    input: Input,
}

impl Pack {
    fn name(&self) -> &'static str {
        match self.input {
            Input::Resource => "htmlpack",
            Input::Literal => "htmlpackString",
        }
    }
}

impl TemplateFunction for Pack {
    fn call(&self, scope: &mut RenderScope<'_>, args: Vec<Value>) -> Result<Value> {
        let function = self.name();
        let first = string_arg(scope, function, &args, 0)?;
        let locator =
            optional_string_arg(scope, function, &args, 1)?.filter(|locator| !locator.is_empty());

        let (markup, source) = match self.input {
            Input::Literal => (first, LITERAL_SOURCE.to_string()),
            Input::Resource => {
                let encoding = encoding_option(scope, args.get(2))?;
                let (target, markup) = read_existing(scope, &first, encoding)?;
                (markup, target)
            }
        };

        pack_fragment(
            self.packer.as_ref(),
            &markup,
            locator.as_deref(),
            self.addressing,
            &self.attribute,
            &source,
        )
        .map(Value::String)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::core::Encoding;
    use crate::filter::FilterLookup;
    use crate::logger::MemoryLogger;
    use crate::pack::TlPacker;
    use crate::template::testing::FixedHost;
    use crate::template::{FunctionTable, parse_script};

    fn functions(config: &ServerConfig) -> FunctionTable {
        let mut functions = FunctionTable::standard();
        let mut filters = FilterLookup::new();
        let packer: Arc<dyn MarkupPacker> = Arc::new(TlPacker);
        let logger = MemoryLogger::default();
        HtmlPackAddon
            .install(&mut AddonContext {
                functions: &mut functions,
                filters: &mut filters,
                packer: &packer,
                config,
                logger: &logger,
            })
            .unwrap();
        functions
    }

    fn run(host: &mut FixedHost, config: &ServerConfig, code: &str) -> Result<String> {
        let functions = functions(config);
        let mut scope = RenderScope::new(host, &functions);
        scope.run(&parse_script(code, 1).unwrap())?;
        Ok(scope.take_output())
    }

    const MENU: &str = r#"<div><ul fragment="main" id="nav"><li>Home</li></ul></div>"#;

    #[test]
    fn packs_resource_fragment() {
        let config = ServerConfig::default();
        let mut host = FixedHost::at("/js/app.ejs", "/js/app.ejs").with("/views/menu.html", MENU);
        let out = run(&mut host, &config, "write(htmlpack('../views/menu.html', 'main'))").unwrap();
        assert_eq!(out, "['ul#nav','@fragment','main',['li','Home']]");
    }

    #[test]
    fn id_addressing() {
        let mut config = ServerConfig::default();
        config.packer.addressing = Addressing::Id;
        let mut host = FixedHost::at("/app.ejs", "/app.ejs").with("/menu.html", MENU);
        let out = run(&mut host, &config, "write(htmlpack('menu.html', 'nav'))").unwrap();
        assert!(out.starts_with("['ul#nav'"));
    }

    #[test]
    fn literal_markup_without_locator() {
        let config = ServerConfig::default();
        let mut host = FixedHost::at("/app.ejs", "/app.ejs");
        let out = run(&mut host, &config, "write(htmlpackString('<b>x</b><i></i>'))").unwrap();
        assert_eq!(out, "['b','x']");
    }

    #[test]
    fn missing_element_names_locator_and_source() {
        let config = ServerConfig::default();
        let mut host = FixedHost::at("/app.ejs", "/app.ejs").with("/menu.html", MENU);

        let err = run(&mut host, &config, "htmlpack('menu.html', 'footer')").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("footer"));
        assert!(message.contains("/menu.html"));

        let err = run(&mut host, &config, "htmlpackString('<p></p>', 'x')").unwrap_err();
        assert!(err.to_string().contains(LITERAL_SOURCE));
    }

    #[test]
    fn empty_locator_selects_first_child() {
        let config = ServerConfig::default();
        let mut host = FixedHost::at("/app.ejs", "/app.ejs").with("/menu.html", MENU);
        let out = run(&mut host, &config, "write(htmlpack('menu.html', ''))").unwrap();
        assert!(out.starts_with("['div',['ul#nav'"));
    }

    #[test]
    fn options_pass_encoding_to_read() {
        let config = ServerConfig::default();
        let mut host = FixedHost::at("/app.ejs", "/app.ejs").with("/menu.html", MENU);
        run(&mut host, &config, "htmlpack('menu.html', null, {encoding: 'latin1'})").unwrap();
        assert_eq!(host.reads[0].1, Some(Encoding::Latin1));
    }

    #[test]
    fn missing_resource_is_an_error() {
        let config = ServerConfig::default();
        let mut host = FixedHost::at("/app.ejs", "/app.ejs");
        let err = run(&mut host, &config, "htmlpack('gone.html')").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/gone.html"));
    }
}
