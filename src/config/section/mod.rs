//! Configuration section definitions.
//!
//! Each module corresponds to sections in `assetserver.toml`:
//!
//! | Module   | TOML Section                       | Purpose                        |
//! |----------|------------------------------------|--------------------------------|
//! | `serve`  | `[serve]`                          | HTTP listener                  |
//! | `server` | `[server]`, `[cache]`, `[packer]`  | Request handling and caching   |
//! | `rules`  | `[[mount]]`, `[[filter]]`          | Address space and filter chains|

mod rules;
mod serve;
mod server;

pub use rules::{FilterRule, MountEntry, StringList};
pub use serve::ServeConfig;
pub use server::{CacheSection, PackerSection, ServerSection};
