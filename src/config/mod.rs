//! Server configuration management for `assetserver.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── rules      # [[mount]], [[filter]]
//! │   ├── serve      # [serve]
//! │   └── server     # [server], [cache], [packer]
//! ├── dsl            # ConfigDsl: mount / loadAddon / filter.on
//! ├── error          # ConfigError, ConfigDiagnostics
//! └── mod.rs         # ServerConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section      | Purpose                                          |
//! |--------------|--------------------------------------------------|
//! | `[server]`   | Default encoding, HTTP caching, optimizer switch |
//! | `[serve]`    | Listener (interface, port, workers)              |
//! | `[cache]`    | Output cache and freshness signatures            |
//! | `[packer]`   | Fragment locator addressing                      |
//! | `addons`     | Addons installed at startup                      |
//! | `[[mount]]`  | Server path to directory bindings                |
//! | `[[filter]]` | Pattern to filter bindings, in order             |

mod dsl;
mod error;
pub mod section;

pub use dsl::ConfigDsl;
pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError};
pub use section::{
    CacheSection, FilterRule, MountEntry, PackerSection, ServeConfig, ServerSection, StringList,
};

use crate::log;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::IpAddr,
    path::{Path, PathBuf},
};

/// File name searched for when no `-C` is given.
pub const DEFAULT_CONFIG_NAME: &str = "assetserver.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing assetserver.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Base for relative mount directories - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub packer: PackerSection,

    /// Addon names, installed in order.
    #[serde(default)]
    pub addons: Vec<String>,

    #[serde(default, rename = "mount")]
    pub mounts: Vec<MountEntry>,

    #[serde(default, rename = "filter")]
    pub filters: Vec<FilterRule>,
}

impl ServerConfig {
    /// Load configuration, searching upward from cwd for `config_name`.
    ///
    /// Without a config file the current directory is served with defaults.
    pub fn load(config_name: &Path) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir()
            .map_err(|e| ConfigError::Io(config_name.to_path_buf(), e))?;

        let mut config = match find_config_file(config_name) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = path;
                config
            }
            None => {
                log!("config"; "{} not found, serving {}", config_name.display(), cwd.display());
                Self::default()
            }
        };

        let root = config
            .config_path
            .parent()
            .map_or(cwd, Path::to_path_buf);
        config.set_root(&root);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    }

    /// Builder form of [`set_root`](Self::set_root).
    pub fn with_root(mut self, path: &Path) -> Self {
        self.set_root(path);
        self
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply serve-specific options.
    pub fn apply_serve_options(
        &mut self,
        interface: Option<IpAddr>,
        port: Option<u16>,
        workers: Option<usize>,
    ) {
        Self::update_option(&mut self.serve.interface, interface.as_ref());
        Self::update_option(&mut self.serve.port, port.as_ref());
        Self::update_option(&mut self.serve.workers, workers.as_ref());
    }

    /// Apply switches shared by every command.
    pub fn apply_common_options(&mut self, no_cache: bool, no_optimize: bool) {
        if no_cache {
            self.cache.enabled = false;
        }
        if no_optimize {
            self.server.no_optimize = true;
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate the whole file, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        for (index, mount) in self.mounts.iter().enumerate() {
            mount.validate(index, &self.root, &mut diag);
        }
        for (index, rule) in self.filters.iter().enumerate() {
            rule.validate(index, &mut diag);
        }
        if self.packer.attribute.trim().is_empty() {
            diag.error("packer.attribute", "must not be empty");
        }

        diag.into_result()
    }
}

/// Find config file by searching upward from current directory
///
/// Starts from cwd and walks up parent directories until finding `config_name`
/// Returns the absolute path to the config file if found
///
/// # Example
/// ```text
/// /home/user/site/static/js/      ← cwd
/// /home/user/site/assetserver.toml  ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.is_file().then(|| config_name.to_path_buf());
    }

    let cwd = std::env::current_dir().ok()?;
    let mut current = cwd.as_path();
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config text.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ServerConfig {
    let (parsed, ignored) = ServerConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
