//! `[[mount]]` and `[[filter]]` tables.
//!
//! # Example
//!
//! ```toml
//! [[mount]]
//! path = "/lib"
//! dir = "vendor/js"           # Relative to the config file
//! exclude = ["*.bak"]         # On top of the default exclusions
//!
//! [[filter]]
//! on = ["*.js", "*.css"]      # A pattern or a list of patterns
//! use = "ejs"                 # A key, or keys tried in order
//!
//! [[filter]]
//! on = "/lib/**/*.js"
//! use = ["#site-minify", "jsoptimize"]
//! ```
//!
//! Bindings apply in file order.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;
use crate::core::LogicalPath;
use crate::utils::pattern::NamePattern;

/// A string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    One(String),
    Many(Vec<String>),
}

impl StringList {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(s) => std::slice::from_ref(s),
            Self::Many(v) => v,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().iter().all(|s| s.trim().is_empty())
    }
}

impl Default for StringList {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

// ============================================================================
// Mount
// ============================================================================

/// One `[[mount]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountEntry {
    /// Logical prefix, e.g. `/lib`.
    pub path: String,
    /// Physical directory.
    pub dir: PathBuf,
    /// Extra name patterns to hide.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl MountEntry {
    /// `dir` made absolute against `root`.
    pub fn resolved_dir(&self, root: &Path) -> PathBuf {
        if self.dir.is_absolute() {
            self.dir.clone()
        } else {
            root.join(&self.dir)
        }
    }

    pub fn validate(&self, index: usize, root: &Path, diag: &mut ConfigDiagnostics) {
        let field = |name: &str| format!("mount[{index}].{name}");

        if !self.path.starts_with('/') || LogicalPath::parse(&self.path).is_none() {
            diag.error_with_hint(
                field("path"),
                format!("`{}` is not an absolute server path", self.path),
                "mount paths look like \"/\" or \"/lib\"",
            );
        }

        let dir = self.resolved_dir(root);
        if !dir.is_dir() {
            diag.error(
                field("dir"),
                format!("`{}` is not a directory", dir.display()),
            );
        }

        if let Err(e) = NamePattern::new(self.exclude.iter().map(String::as_str)) {
            diag.error(field("exclude"), format!("invalid pattern: {e}"));
        }
    }
}

// ============================================================================
// Filter
// ============================================================================

/// One `[[filter]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRule {
    /// Path patterns; each becomes its own binding.
    pub on: StringList,
    /// Filter lookup keys, first found wins.
    #[serde(rename = "use")]
    pub keys: StringList,
}

impl FilterRule {
    pub fn validate(&self, index: usize, diag: &mut ConfigDiagnostics) {
        if self.on.is_empty() {
            diag.error(format!("filter[{index}].on"), "no path pattern given");
        }
        if self.keys.is_empty() {
            diag.error_with_hint(
                format!("filter[{index}].use"),
                "no filter given",
                "use = \"ejs\" or use = [\"#my-filter\", \"ejs\"]",
            );
        }
    }
}
