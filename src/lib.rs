//! assetserver - an embeddable asset server.
//!
//! Logical paths resolve through a mount table to resources, run through
//! ordered filter chains (templates, minifiers, addon filters) and are
//! cached with every file they read, so a result is reused until one of its
//! inputs changes.
//!
//! # Module Structure
//!
//! | Module      | Purpose                                              |
//! |-------------|------------------------------------------------------|
//! | `address`   | Mount table, stores and locators                     |
//! | `cache`     | Dependency tracking and the output cache             |
//! | `filter`    | Filter trait, lookup keys, bindings                  |
//! | `template`  | Template parser, evaluator and functions             |
//! | `pack`      | Markup fragment packer                               |
//! | `addon`     | Addons (`htmlpack`)                                  |
//! | `pipeline`  | Request resolution and the serving front             |
//! | `config`    | `assetserver.toml` and the setup surface             |
//! | `freshness` | Content hashes and file signatures                   |
//! | `core`      | Logical paths and encodings                          |
//! | `logger`    | Terminal output and the injectable logger            |

pub mod addon;
pub mod address;
pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod filter;
pub mod freshness;
pub mod logger;
pub mod pack;
pub mod pipeline;
pub mod template;
pub mod utils;

pub use config::{ConfigDsl, ServerConfig};
pub use error::{AssetError, Result};
pub use pipeline::{AssetServer, Pipeline};
