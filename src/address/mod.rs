//! Address space - from logical paths to resource handles.
//!
//! # Architecture
//!
//! ```text
//! /lib/widgets/tree$theme=dark$.js
//!   |
//!   v  MountTable::resolve (longest prefix, whole segments)
//! mount /lib  ->  AssetPath { remainder: [widgets, tree.js], params: {theme: dark} }
//!   |
//!   v  AssetStore::locate
//! Locator (file or buffer, content type, encoding, probe)
//! ```
//!
//! # Module Structure
//!
//! - [`asset_path`]: decoded, validated path below a mount point
//! - [`locator`]: resource handle
//! - [`store`]: directory and memory backing stores
//! - [`mount`]: the mount table
//!
//! Nothing here caches; resolution is cheap and callers cache results.

mod asset_path;
mod locator;
mod mount;
mod store;

pub use asset_path::{AssetPath, is_valid_segment, parse_params};
pub use locator::{Body, Locator};
pub use mount::{Lookup, Mount, MountTable};
pub use store::{AssetStore, DirectoryStore, MemoryStore, StoreLookup, StoreOptions};
