//! Template evaluator.
//!
//! # Architecture
//!
//! ```text
//! source ──parser──► events ──expr──► TemplateProgram [Literal | Computed]*
//!                                            │
//!                                            ▼ render(RenderScope)
//!                     TemplateHost (read, thisPath, ...) ◄── stdlib functions
//! ```
//!
//! # Module Structure
//!
//! - [`parser`]: template source to literal / block / interpolation events
//! - [`expr`]: the small expression language inside blocks
//! - [`scope`]: render scope, host trait and evaluation
//! - [`program`]: fragments and compiled programs
//! - [`stdlib`]: functions callable from templates

mod expr;
mod parser;
mod program;
mod scope;
mod stdlib;

pub use expr::{Expr, Script, Stmt, SyntaxError, parse_expr, parse_script};
pub use parser::{Event, parse};
pub use program::{Fragment, Segment, TemplateProgram};
pub use scope::{RenderScope, TemplateHost, kind, to_text};
pub use stdlib::{
    FunctionTable, TemplateFunction, encoding_option, optional_string_arg, read_existing, read_relative,
    resolve_path, string_arg,
};

#[cfg(test)]
pub(crate) use scope::testing;
