//! Path predicates selecting which resources a filter applies to.
//!
//! Built from pattern strings:
//!
//! | Pattern            | Predicate     | Matches                         |
//! |--------------------|---------------|---------------------------------|
//! | `index.html`       | `NameLiteral` | base name equals                |
//! | `*.ejs.js`         | `NameGlob`    | base name glob                  |
//! | `/lib/loader.js`   | `PathLiteral` | full path equals                |
//! | `/lib/**/*.js`     | `PathGlob`    | full path glob, `**` spans dirs |

use std::fmt;
use std::sync::Arc;

use crate::address::AssetPath;
use crate::core::normalize;
use crate::error::{AssetError, Result};
use crate::utils::pattern::{NamePattern, PathPattern, has_wildcards};

/// A custom test over resolved paths.
pub trait PathTest: Send + Sync + fmt::Debug {
    fn matches(&self, path: &AssetPath) -> bool;
}

/// Boolean test over a resolved path. Pure; safe to share across threads.
#[derive(Debug, Clone)]
pub enum Predicate {
    NameLiteral(String),
    NameGlob(NamePattern),
    PathLiteral(String),
    PathGlob(PathPattern),
    Custom(Arc<dyn PathTest>),
}

impl Predicate {
    /// Build the best-fitting predicate for a pattern string.
    pub fn build(pattern: &str) -> Result<Self> {
        let invalid =
            |e: regex::Error| AssetError::configuration(format!("invalid pattern `{pattern}`: {e}"));

        if pattern.is_empty() {
            return Err(AssetError::configuration("empty pattern"));
        }

        if !pattern.contains('/') {
            return Ok(if has_wildcards(pattern) {
                Self::NameGlob(NamePattern::new([pattern]).map_err(invalid)?)
            } else {
                Self::NameLiteral(pattern.to_string())
            });
        }

        if has_wildcards(pattern) {
            Ok(Self::PathGlob(PathPattern::new(pattern).map_err(invalid)?))
        } else {
            let path = normalize("/", pattern).ok_or_else(|| {
                AssetError::configuration(format!("pattern `{pattern}` climbs above the root"))
            })?;
            Ok(Self::PathLiteral(path))
        }
    }

    pub fn custom(test: impl PathTest + 'static) -> Self {
        Self::Custom(Arc::new(test))
    }

    pub fn matches(&self, path: &AssetPath) -> bool {
        match self {
            Self::NameLiteral(name) => path.base_name() == name,
            Self::NameGlob(pattern) => pattern.matches(path.base_name()),
            Self::PathLiteral(full) => path.full_path().as_str() == full,
            Self::PathGlob(pattern) => pattern.matches(path.full_path().as_str()),
            Self::Custom(test) => test.matches(path),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameLiteral(name) => write!(f, "name {name}"),
            Self::NameGlob(pattern) => write!(f, "name {pattern}"),
            Self::PathLiteral(path) => write!(f, "path {path}"),
            Self::PathGlob(pattern) => write!(f, "path {}", pattern.as_str()),
            Self::Custom(test) => write!(f, "custom {test:?}"),
        }
    }
}
