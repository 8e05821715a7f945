//! Functions callable from template code.
//!
//! | Function                     | Returns                                  |
//! |------------------------------|------------------------------------------|
//! | `read(path, {encoding})`     | text, or null when not found             |
//! | `include(path, {encoding})`  | writes the text; not found is an error   |
//! | `write(values...)`           | writes each non-null value               |
//! | `requestedPath()`            | path the client asked for                |
//! | `thisPath()`                 | path of the resource being evaluated     |
//! | `clientRelative(path)`       | `path` re-expressed against the request  |
//! | `escapeForScript(text)`      | script string literal body               |
//! | `escapeForMarkup(text)`      | markup-safe text                         |
//! | `escapeForXml(text)`         | XML-safe text                            |
//! | `log(values...)`             | logs through the host logger             |
//! | `param(name, default)`       | request parameter or `default`           |
//!
//! Relative paths resolve against the directory of the resource being
//! evaluated, never against the request.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use super::scope::{RenderScope, kind, to_text};
use crate::core::{Encoding, dirname, normalize, translate_relative};
use crate::error::{AssetError, Missing, Result};
use crate::utils::escape::{escape_for_markup, escape_for_script, escape_for_xml};

/// A function exposed to templates.
pub trait TemplateFunction: Send + Sync {
    fn call(&self, scope: &mut RenderScope<'_>, args: Vec<Value>) -> Result<Value>;
}

impl<F> TemplateFunction for F
where
    F: Fn(&mut RenderScope<'_>, Vec<Value>) -> Result<Value> + Send + Sync,
{
    fn call(&self, scope: &mut RenderScope<'_>, args: Vec<Value>) -> Result<Value> {
        self(scope, args)
    }
}

/// Name to function table. Built at setup, shared by every render.
#[derive(Clone, Default)]
pub struct FunctionTable {
    functions: FxHashMap<String, Arc<dyn TemplateFunction>>,
}

impl FunctionTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with the standard functions.
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register("read", read);
        table.register("include", include);
        table.register("write", write);
        table.register("requestedPath", requested_path);
        table.register("thisPath", this_path);
        table.register("clientRelative", client_relative);
        table.register("escapeForScript", |scope: &mut RenderScope<'_>, args: Vec<Value>| {
            escape(scope, "escapeForScript", &args, |s| escape_for_script(s).into_owned())
        });
        table.register("escapeForMarkup", |scope: &mut RenderScope<'_>, args: Vec<Value>| {
            escape(scope, "escapeForMarkup", &args, |s| escape_for_markup(s).into_owned())
        });
        table.register("escapeForXml", |scope: &mut RenderScope<'_>, args: Vec<Value>| {
            escape(scope, "escapeForXml", &args, |s| escape_for_xml(s).into_owned())
        });
        table.register("log", log);
        table.register("param", param);
        table
    }

    /// Add or replace a function.
    pub fn register(&mut self, name: &str, function: impl TemplateFunction + 'static) {
        self.functions.insert(name.to_string(), Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TemplateFunction>> {
        self.functions.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

/// The string argument at `index`.
pub fn string_arg(
    scope: &RenderScope<'_>,
    function: &str,
    args: &[Value],
    index: usize,
) -> Result<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(scope.error(format!(
            "{function}: argument {} must be a string, not {}",
            index + 1,
            kind(other)
        ))),
        None => Err(scope.error(format!("{function}: missing argument {}", index + 1))),
    }
}

/// The optional string argument at `index`; null counts as absent.
pub fn optional_string_arg(
    scope: &RenderScope<'_>,
    function: &str,
    args: &[Value],
    index: usize,
) -> Result<Option<String>> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => string_arg(scope, function, args, index).map(Some),
    }
}

/// The `encoding` entry of an options map.
pub fn encoding_option(scope: &RenderScope<'_>, options: Option<&Value>) -> Result<Option<Encoding>> {
    match options {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => match map.get("encoding") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(label)) => label
                .parse::<Encoding>()
                .map(Some)
                .map_err(|e| scope.error(e.to_string())),
            Some(other) => Err(scope.error(format!(
                "encoding must be a string, not {}",
                kind(other)
            ))),
        },
        Some(other) => Err(scope.error(format!("options must be a map, not {}", kind(other)))),
    }
}

/// Resolve `path` against the resource being evaluated.
///
/// `None` when the path climbs above the root: nothing can exist there.
pub fn resolve_path(scope: &RenderScope<'_>, path: &str) -> Option<String> {
    normalize(dirname(scope.this_path()), path)
}

/// Read a resource relative to the one being evaluated.
pub fn read_relative(
    scope: &mut RenderScope<'_>,
    path: &str,
    encoding: Option<Encoding>,
) -> Result<Option<String>> {
    match resolve_path(scope, path) {
        Some(target) => scope.host().read(&target, encoding),
        None => Ok(None),
    }
}

/// Like [`read_relative`], with a missing resource as a not found error.
///
/// Returns the resolved path along with the text.
pub fn read_existing(
    scope: &mut RenderScope<'_>,
    path: &str,
    encoding: Option<Encoding>,
) -> Result<(String, String)> {
    let target = resolve_path(scope, path);
    let text = match &target {
        Some(target) => scope.host().read(target, encoding)?,
        None => None,
    };
    match (target, text) {
        (Some(target), Some(text)) => Ok((target, text)),
        (target, _) => Err(AssetError::not_found(
            Missing::Resource,
            target.unwrap_or_else(|| path.to_string()),
            scope.origin(),
        )),
    }
}

// ============================================================================
// Standard functions
// ============================================================================

fn read(scope: &mut RenderScope<'_>, args: Vec<Value>) -> Result<Value> {
    let path = string_arg(scope, "read", &args, 0)?;
    let encoding = encoding_option(scope, args.get(1))?;
    Ok(read_relative(scope, &path, encoding)?.map_or(Value::Null, Value::String))
}

fn include(scope: &mut RenderScope<'_>, args: Vec<Value>) -> Result<Value> {
    let path = string_arg(scope, "include", &args, 0)?;
    let encoding = encoding_option(scope, args.get(1))?;
    let (_, text) = read_existing(scope, &path, encoding)?;
    scope.write_str(&text);
    Ok(Value::Null)
}

fn write(scope: &mut RenderScope<'_>, args: Vec<Value>) -> Result<Value> {
    for value in &args {
        scope.write(value);
    }
    Ok(Value::Null)
}

fn requested_path(scope: &mut RenderScope<'_>, _: Vec<Value>) -> Result<Value> {
    Ok(Value::String(scope.requested_path().to_string()))
}

fn this_path(scope: &mut RenderScope<'_>, _: Vec<Value>) -> Result<Value> {
    Ok(Value::String(scope.this_path().to_string()))
}

fn client_relative(scope: &mut RenderScope<'_>, args: Vec<Value>) -> Result<Value> {
    let path = string_arg(scope, "clientRelative", &args, 0)?;
    let requested = scope.requested_path().to_string();
    translate_relative(dirname(scope.this_path()), dirname(&requested), &path)
    .map(Value::String)
    .ok_or_else(|| scope.error(format!("`{path}` climbs above the root")))
}

fn escape(
    scope: &RenderScope<'_>,
    function: &str,
    args: &[Value],
    apply: fn(&str) -> String,
) -> Result<Value> {
    match args.first() {
        None | Some(Value::Null) => Ok(Value::Null),
        Some(Value::String(s)) => Ok(Value::String(apply(s))),
        Some(other) => match to_text(other) {
            Some(text) => Ok(Value::String(apply(&text))),
            None => Err(scope.error(format!("{function}: nothing to escape"))),
        },
    }
}

fn log(scope: &mut RenderScope<'_>, args: Vec<Value>) -> Result<Value> {
    let message = args
        .iter()
        .map(|v| to_text(v).unwrap_or_else(|| "null".to_string()))
        .collect::<Vec<_>>()
        .join(" ");
    scope
        .logger()
        .info("template", &format!("{}: {message}", scope.origin()));
    Ok(Value::Null)
}

fn param(scope: &mut RenderScope<'_>, args: Vec<Value>) -> Result<Value> {
    let name = string_arg(scope, "param", &args, 0)?;
    match scope.host().params().get(&name) {
        Some(value) => Ok(Value::String(value.clone())),
        None => Ok(args.get(1).cloned().unwrap_or(Value::Null)),
    }
}
