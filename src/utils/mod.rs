//! Utility modules shared by the pipeline.
//!
//! | Module    | Purpose                                        |
//! |-----------|------------------------------------------------|
//! | `escape`  | Script, markup and XML escaping                |
//! | `mime`    | Content types from file names                  |
//! | `pattern` | Name globs, path globs and default exclusions  |

pub mod escape;
pub mod mime;
pub mod pattern;
