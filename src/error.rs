//! Error taxonomy for the asset pipeline.
//!
//! Every variant carries enough context (the key or path involved and the
//! resource that was being evaluated) to diagnose a failure without looking
//! at cache internals.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// What kind of thing a not-found error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// A logical resource path.
    Resource,
    /// A filter lookup key list.
    Filter,
    /// A packer element locator.
    Element,
    /// A template function or addon.
    Function,
    Addon,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resource => "resource",
            Self::Filter => "filter",
            Self::Element => "element",
            Self::Function => "function",
            Self::Addon => "addon",
        })
    }
}

/// Pipeline error.
#[derive(Debug, Error)]
pub enum AssetError {
    /// A lookup miss that the caller asked to be fatal.
    #[error("{what} `{key}` not found (in {origin})")]
    NotFound {
        what: Missing,
        key: String,
        origin: String,
    },

    /// Unrecognized setup input; fails server startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A computed template segment or filter failed while rendering.
    #[error("evaluation error in {origin}: {message}")]
    Evaluation { origin: String, message: String },

    #[error("IO error when reading `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AssetError {
    pub fn not_found(what: Missing, key: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            key: key.into(),
            origin: origin.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn evaluation(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Evaluation {
            origin: origin.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this is a lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T, E = AssetError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn not_found_names_key_and_origin() {
        let err = AssetError::not_found(Missing::Element, "missing", "/pages/a.html");
        let display = err.to_string();
        assert!(display.contains("element"));
        assert!(display.contains("`missing`"));
        assert!(display.contains("/pages/a.html"));
        assert!(err.is_not_found());
    }

    #[test]
    fn evaluation_display() {
        let err = AssetError::evaluation("/t/page.ejs", "unknown function `frob`");
        assert_eq!(
            err.to_string(),
            "evaluation error in /t/page.ejs: unknown function `frob`"
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn io_display() {
        let err = AssetError::io("a.txt", Error::new(ErrorKind::NotFound, "gone"));
        assert!(err.to_string().contains("a.txt"));
    }
}
