//! Core types - pure abstractions shared across the codebase.

mod encoding;
mod path;

pub use encoding::{Encoding, UnknownEncoding};
pub use path::{LogicalPath, dirname, join_absolute, normalize, normalize_segments, split_path, translate_relative};
