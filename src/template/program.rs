//! Compiled templates.
//!
//! A [`TemplateProgram`] is an ordered list of fragments. Rendering walks
//! the list once, in order: literals are written verbatim, computed
//! fragments are evaluated and their non-null result is written.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::expr::{Expr, Script, SyntaxError, parse_expr, parse_script};
use super::parser::{Event, parse};
use super::scope::RenderScope;
use crate::error::{AssetError, Result};

/// A computed fragment.
pub trait Segment: Send + Sync {
    /// Evaluate; `None` writes nothing.
    fn evaluate(&self, scope: &mut RenderScope<'_>) -> Result<Option<Value>>;
}

impl<F> Segment for F
where
    F: Fn(&mut RenderScope<'_>) -> Result<Option<Value>> + Send + Sync,
{
    fn evaluate(&self, scope: &mut RenderScope<'_>) -> Result<Option<Value>> {
        self(scope)
    }
}

/// Statements; writes happen through `write` and friends.
struct BlockSegment(Script);

impl Segment for BlockSegment {
    fn evaluate(&self, scope: &mut RenderScope<'_>) -> Result<Option<Value>> {
        scope.run(&self.0)?;
        Ok(None)
    }
}

/// One expression whose value is written.
struct ExprSegment(Expr);

impl Segment for ExprSegment {
    fn evaluate(&self, scope: &mut RenderScope<'_>) -> Result<Option<Value>> {
        let value = scope.eval(&self.0)?;
        Ok((!value.is_null()).then_some(value))
    }
}

/// One unit of a program.
#[derive(Clone)]
pub enum Fragment {
    Literal(String),
    Computed(Arc<dyn Segment>),
}

impl Fragment {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn computed(segment: impl Segment + 'static) -> Self {
        Self::Computed(Arc::new(segment))
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            Self::Computed(_) => f.write_str("Computed"),
        }
    }
}

/// Immutable, reusable compiled template.
#[derive(Debug, Clone)]
pub struct TemplateProgram {
    origin: String,
    fragments: Vec<Fragment>,
    identity: bool,
}

impl TemplateProgram {
    /// Program from ready-made fragments.
    pub fn from_fragments(origin: impl Into<String>, fragments: Vec<Fragment>) -> Self {
        let identity = fragments
            .iter()
            .all(|f| matches!(f, Fragment::Literal(_)));
        Self {
            origin: origin.into(),
            fragments,
            identity,
        }
    }

    /// Compile template source. Syntax errors name `origin` and the line.
    pub fn compile(source: &str, origin: &str) -> Result<Self> {
        let syntax = |e: SyntaxError| {
            AssetError::evaluation(origin, format!("line {}: {}", e.line, e.message))
        };

        let mut fragments: Vec<Fragment> = Vec::new();
        for event in parse(source) {
            match event {
                Event::Literal(text) => match fragments.last_mut() {
                    Some(Fragment::Literal(prev)) => prev.push_str(&text),
                    _ => fragments.push(Fragment::Literal(text)),
                },
                Event::Block { code, line } => {
                    let script = parse_script(&code, line).map_err(syntax)?;
                    if !script.stmts.is_empty() {
                        fragments.push(Fragment::computed(BlockSegment(script)));
                    }
                }
                Event::Interpolation { code, line } => {
                    let expr = parse_expr(&code, line).map_err(syntax)?;
                    fragments.push(Fragment::computed(ExprSegment(expr)));
                }
            }
        }

        let mut program = Self::from_fragments(origin, fragments);
        // Only a source that was never switched into template mode renders
        // to itself.
        program.identity &= program.literal_text() == source;
        Ok(program)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Whether rendering reproduces the source unchanged.
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    fn literal_text(&self) -> String {
        self.fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::Literal(text) => Some(text.as_str()),
                Fragment::Computed(_) => None,
            })
            .collect()
    }

    /// Render into the scope's sink.
    ///
    /// On failure nothing this render wrote is kept.
    pub fn render(&self, scope: &mut RenderScope<'_>) -> Result<()> {
        let start = scope.output_len();
        for fragment in &self.fragments {
            let step = match fragment {
                Fragment::Literal(text) => {
                    scope.write_str(text);
                    Ok(())
                }
                Fragment::Computed(segment) => match segment.evaluate(scope) {
                    Ok(Some(value)) => {
                        scope.write(&value);
                        Ok(())
                    }
                    Ok(None) => Ok(()),
                    Err(e) => Err(e),
                },
            };
            if let Err(e) = step {
                scope.truncate_output(start);
                return Err(e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::FunctionTable;
    use crate::template::scope::testing::FixedHost;

    fn render(program: &TemplateProgram, host: &mut FixedHost) -> Result<String> {
        let functions = FunctionTable::standard();
        let mut scope = RenderScope::new(host, &functions);
        program.render(&mut scope)?;
        Ok(scope.take_output())
    }

    fn compile_and_render(source: &str, host: &mut FixedHost) -> Result<String> {
        render(&TemplateProgram::compile(source, "/t.ejs")?, host)
    }

    mod fragments {
        use super::*;

        #[test]
        fn null_result_writes_nothing() {
            let program = TemplateProgram::from_fragments(
                "/t.ejs",
                vec![
                    Fragment::literal("a"),
                    Fragment::computed(|_: &mut RenderScope<'_>| -> Result<Option<Value>> { Ok(None) }),
                    Fragment::literal("b"),
                ],
            );
            let mut host = FixedHost::at("/t.ejs", "/t.ejs");
            assert_eq!(render(&program, &mut host).unwrap(), "ab");
            assert!(!program.is_identity());
        }

        #[test]
        fn computed_value_is_written() {
            let program = TemplateProgram::from_fragments(
                "/t.ejs",
                vec![
                    Fragment::computed(|_: &mut RenderScope<'_>| -> Result<Option<Value>> {
                        Ok(Some(Value::from(7)))
                    }),
                    Fragment::literal("!"),
                ],
            );
            let mut host = FixedHost::at("/t.ejs", "/t.ejs");
            assert_eq!(render(&program, &mut host).unwrap(), "7!");
        }

        #[test]
        fn failure_discards_partial_output() {
            let program = TemplateProgram::from_fragments(
                "/t.ejs",
                vec![
                    Fragment::literal("partial"),
                    Fragment::computed(|scope: &mut RenderScope<'_>| -> Result<Option<Value>> {
                        Err(scope.error("boom"))
                    }),
                ],
            );
            let mut host = FixedHost::at("/t.ejs", "/t.ejs");
            let functions = FunctionTable::standard();
            let mut scope = RenderScope::new(&mut host, &functions);
            let err = program.render(&mut scope).unwrap_err();
            assert!(err.to_string().contains("boom"));
            assert_eq!(scope.output(), "");
        }

        #[test]
        fn programs_are_reusable() {
            let program = TemplateProgram::compile("##EJSON\n#{param('n', 'x')}\n", "/t.ejs").unwrap();
            let mut host = FixedHost::at("/t.ejs", "/t.ejs");
            assert_eq!(render(&program, &mut host).unwrap(), "x\n");
            host.params.insert("n".into(), "y".into());
            assert_eq!(render(&program, &mut host).unwrap(), "y\n");
        }
    }

    mod compile {
        use super::*;

        #[test]
        fn plain_text_is_identity() {
            let program = TemplateProgram::compile("a #{b}\n", "/t.ejs").unwrap();
            assert!(program.is_identity());
        }

        #[test]
        fn literal_only_template_mode_is_not_identity() {
            let program = TemplateProgram::compile("##EJSON\nhi\n", "/t.ejs").unwrap();
            assert!(!program.is_identity());
            let mut host = FixedHost::at("/t.ejs", "/t.ejs");
            assert_eq!(render(&program, &mut host).unwrap(), "hi\n");
        }

        #[test]
        fn directives_and_interpolations() {
            let source = "##EJSON\n## let who = 'world'\nHello, #{who}!\n#{null}";
            let mut host = FixedHost::at("/t.ejs", "/t.ejs");
            assert_eq!(compile_and_render(source, &mut host).unwrap(), "Hello, world!\n");
        }

        #[test]
        fn syntax_errors_name_origin_and_line() {
            let err = TemplateProgram::compile("##EJSON\nok\n## let = 1\n", "/t/page.ejs").unwrap_err();
            let message = err.to_string();
            assert!(message.contains("/t/page.ejs"));
            assert!(message.contains("line 3"));
        }

        #[test]
        fn blocks_write_through_functions() {
            let source = "##EJSON\n##=\nwrite('<' + 'b>')\n##=\ntail";
            let mut host = FixedHost::at("/t.ejs", "/t.ejs");
            assert_eq!(compile_and_render(source, &mut host).unwrap(), "<b>tail");
        }
    }
}
