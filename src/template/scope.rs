//! Render scope: what a computed fragment sees while it runs.
//!
//! There are no ambient globals. Everything a fragment or template function
//! can reach (the host pipeline, the function table, variables and the
//! output sink) hangs off the [`RenderScope`] it is handed.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde_json::Value;

use super::expr::{Expr, Script, Stmt, object};
use super::stdlib::FunctionTable;
use crate::core::Encoding;
use crate::error::{AssetError, Missing, Result};
use crate::logger::Logger;

/// The pipeline side of a render.
pub trait TemplateHost {
    /// Read the resource at absolute `path` through the pipeline.
    ///
    /// `Ok(None)` when it does not exist. The read is recorded as a
    /// dependency of whatever is being computed.
    fn read(&mut self, path: &str, encoding: Option<Encoding>) -> Result<Option<String>>;

    /// Path of the resource being evaluated.
    fn this_path(&self) -> &str;

    /// Path the client asked for.
    ///
    /// Output that uses it varies with the request and is cached per root.
    fn requested_path(&mut self) -> &str;

    /// Parameters of the resource being evaluated.
    fn params(&self) -> &BTreeMap<String, String>;

    fn logger(&self) -> &dyn Logger;
}

/// Mutable state of one template render.
pub struct RenderScope<'a> {
    host: &'a mut dyn TemplateHost,
    functions: &'a FunctionTable,
    origin: String,
    vars: FxHashMap<String, Value>,
    out: String,
}

impl<'a> RenderScope<'a> {
    /// New scope with `params` bound to the host's parameters.
    pub fn new(host: &'a mut dyn TemplateHost, functions: &'a FunctionTable) -> Self {
        let origin = host.this_path().to_string();
        let params = object(
            host.params()
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone()))),
        );
        let mut vars = FxHashMap::default();
        vars.insert("params".to_string(), params);
        Self {
            host,
            functions,
            origin,
            vars,
            out: String::new(),
        }
    }

    pub fn host(&mut self) -> &mut dyn TemplateHost {
        &mut *self.host
    }

    pub fn this_path(&self) -> &str {
        self.host.this_path()
    }

    pub fn requested_path(&mut self) -> &str {
        self.host.requested_path()
    }

    pub fn logger(&self) -> &dyn Logger {
        self.host.logger()
    }

    pub fn functions(&self) -> &FunctionTable {
        self.functions
    }

    /// Name of the template being rendered, for error messages.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// An evaluation error attributed to this template.
    pub fn error(&self, message: impl Into<String>) -> AssetError {
        AssetError::evaluation(&self.origin, message)
    }

    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Write a value's text form. Null writes nothing.
    pub fn write(&mut self, value: &Value) {
        match value {
            Value::Null => {}
            Value::String(s) => self.out.push_str(s),
            other => self.out.push_str(&other.to_string()),
        }
    }

    pub fn write_str(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub fn output(&self) -> &str {
        &self.out
    }

    pub(crate) fn output_len(&self) -> usize {
        self.out.len()
    }

    pub(crate) fn truncate_output(&mut self, len: usize) {
        self.out.truncate(len);
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.out)
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    pub fn run(&mut self, script: &Script) -> Result<()> {
        for stmt in &script.stmts {
            match stmt {
                Stmt::Let(name, expr) => {
                    let value = self.eval(expr)?;
                    self.set_var(name.clone(), value);
                }
                Stmt::Expr(expr) => {
                    self.eval(expr)?;
                }
            }
        }
        Ok(())
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Var(name) => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| self.error(format!("`{name}` is not defined"))),
            Expr::Member(target, field) => match self.eval(target)? {
                Value::Object(mut map) => Ok(map.remove(field).unwrap_or(Value::Null)),
                Value::String(s) if field == "length" => Ok(Value::from(s.chars().count())),
                Value::Array(items) if field == "length" => Ok(Value::from(items.len())),
                Value::Null => Err(self.error(format!("cannot read `{field}` of null"))),
                _ => Ok(Value::Null),
            },
            Expr::Index(target, index) => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                Ok(match (target, index) {
                    (Value::Array(mut items), Value::Number(n)) => n
                        .as_u64()
                        .and_then(|i| usize::try_from(i).ok())
                        .filter(|&i| i < items.len())
                        .map(|i| items.swap_remove(i))
                        .unwrap_or(Value::Null),
                    (Value::Object(mut map), Value::String(key)) => {
                        map.remove(&key).unwrap_or(Value::Null)
                    }
                    (Value::Null, _) => return Err(self.error("cannot index null")),
                    _ => Value::Null,
                })
            }
            Expr::Call(name, args) => {
                let functions = self.functions;
                let Some(function) = functions.get(name) else {
                    return Err(AssetError::not_found(
                        Missing::Function,
                        name.as_str(),
                        self.origin.as_str(),
                    ));
                };
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>>>()?;
                function.call(self, args)
            }
            Expr::Add(left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.add(left, right)
            }
            Expr::Map(entries) => {
                let mut values = Vec::with_capacity(entries.len());
                for (key, expr) in entries {
                    values.push((key.clone(), self.eval(expr)?));
                }
                Ok(object(values))
            }
            Expr::List(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<_>>()?,
            )),
        }
    }

    /// `+`: string concatenation if either side is a string, else addition.
    fn add(&self, left: Value, right: Value) -> Result<Value> {
        match (&left, &right) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(concat_text(&left) + &concat_text(&right)))
            }
            (Value::Number(a), Value::Number(b)) => {
                if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64())
                    && let Some(sum) = a.checked_add(b)
                {
                    return Ok(Value::from(sum));
                }
                let sum = a.as_f64().unwrap_or(f64::NAN) + b.as_f64().unwrap_or(f64::NAN);
                Ok(Value::from(sum))
            }
            _ => Err(self.error(format!(
                "cannot add {} and {}",
                kind(&left),
                kind(&right)
            ))),
        }
    }
}

/// Text form of a value.
///
/// `None` for null; strings as is; everything else as JSON.
pub fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn concat_text(value: &Value) -> String {
    to_text(value).unwrap_or_else(|| "null".to_string())
}

/// Type name for error messages.
pub fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FixedHost;
    use super::*;
    use crate::template::expr::{parse_expr, parse_script};

    fn eval(host: &mut FixedHost, code: &str) -> Result<Value> {
        let functions = FunctionTable::standard();
        let mut scope = RenderScope::new(host, &functions);
        scope.eval(&parse_expr(code, 1).unwrap())
    }

    #[test]
    fn params_are_bound() {
        let mut host = FixedHost::at("/a.ejs", "/a.ejs");
        host.params.insert("theme".into(), "dark".into());
        assert_eq!(eval(&mut host, "params.theme").unwrap(), "dark");
        assert_eq!(eval(&mut host, "params.missing").unwrap(), Value::Null);
    }

    #[test]
    fn addition() {
        let mut host = FixedHost::at("/a.ejs", "/a.ejs");
        assert_eq!(eval(&mut host, "1 + 2").unwrap(), 3);
        assert_eq!(eval(&mut host, "'v' + 1 + null").unwrap(), "v1null");
        assert_eq!(eval(&mut host, "0.5 + 1").unwrap(), 1.5);
        assert!(eval(&mut host, "true + 1").is_err());
    }

    #[test]
    fn member_and_index() {
        let mut host = FixedHost::at("/a.ejs", "/a.ejs");
        assert_eq!(eval(&mut host, "{a: [1, {b: 'x'}]}.a[1].b").unwrap(), "x");
        assert_eq!(eval(&mut host, "[1, 2][5]").unwrap(), Value::Null);
        assert_eq!(eval(&mut host, "'héllo'.length").unwrap(), 5);
        assert!(eval(&mut host, "null.x").is_err());
    }

    #[test]
    fn undefined_names() {
        let mut host = FixedHost::at("/a.ejs", "/a.ejs");
        let err = eval(&mut host, "nope").unwrap_err();
        assert!(err.to_string().contains("`nope` is not defined"));

        let err = eval(&mut host, "frob(1)").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/a.ejs"));
    }

    #[test]
    fn variables_persist_across_scripts() {
        let mut host = FixedHost::at("/a.ejs", "/a.ejs");
        let functions = FunctionTable::standard();
        let mut scope = RenderScope::new(&mut host, &functions);
        scope.run(&parse_script("let name = 'x'", 1).unwrap()).unwrap();
        scope
            .run(&parse_script("write(name + '!')", 2).unwrap())
            .unwrap();
        assert_eq!(scope.output(), "x!");
    }

    #[test]
    fn text_forms() {
        assert_eq!(to_text(&Value::Null), None);
        assert_eq!(to_text(&Value::from("s")).as_deref(), Some("s"));
        assert_eq!(to_text(&Value::from(2)).as_deref(), Some("2"));
        assert_eq!(to_text(&Value::from(true)).as_deref(), Some("true"));
    }
}
