//! Logical path type for slash-separated server paths.
//!
//! - Always absolute (starts with `/`)
//! - Never ends with `/` unless it is the root
//! - `.` and `..` segments are collapsed; climbing above `/` is rejected

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Normalized, absolute server path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalPath(Arc<str>);

impl LogicalPath {
    /// The root path `/`.
    pub fn root() -> Self {
        Self(Arc::from("/"))
    }

    /// Parse an absolute path, normalizing it.
    ///
    /// Relative input is interpreted against `/`. Returns `None` when a `..`
    /// segment climbs above the root.
    pub fn parse(path: &str) -> Option<Self> {
        normalize("/", path).map(|p| Self(Arc::from(p)))
    }

    /// Parse a request target as sent by a client.
    ///
    /// Strips the query string and fragment. Percent-decoding is left to the
    /// per-component handling in [`crate::address::AssetPath`].
    pub fn from_request(target: &str) -> Option<Self> {
        let path = target.split(['?', '#']).next().unwrap_or(target);
        Self::parse(path)
    }

    /// Resolve `path` relative to the directory containing this path.
    ///
    /// Absolute `path` values ignore `self` entirely.
    pub fn resolve(&self, path: &str) -> Option<Self> {
        normalize(self.dirname(), path).map(|p| Self(Arc::from(p)))
    }

    /// Directory part of the path, including the trailing slash.
    #[inline]
    pub fn dirname(&self) -> &str {
        dirname(&self.0)
    }

    /// Last path segment (empty for the root).
    pub fn base_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Path segments, without empty segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        &*self.0 == "/"
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for LogicalPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Free functions
// ============================================================================

/// Split a path into segments, ignoring leading, trailing and doubled slashes.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Normalize `path` into segments.
///
/// If `path` is relative, the segments of `relative_to` are prepended first.
/// `.` and `..` are expanded in `path` only. Returns `None` if `..` climbs
/// above the root.
pub fn normalize_segments<'a>(relative_to: &'a str, path: &'a str) -> Option<Vec<&'a str>> {
    let mut segments: Vec<&str> = Vec::new();
    if !path.starts_with('/') {
        segments.extend(split_path(relative_to));
    }

    for segment in split_path(path) {
        match segment {
            "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    Some(segments)
}

/// Normalize `path` against `relative_to`, returning an absolute path.
///
/// The result always starts with `/` and never ends with one unless it is
/// the root.
///
/// # Examples
/// ```ignore
/// normalize("/templates/", "./x")     -> Some("/templates/x")
/// normalize("/templates/", "../x")    -> Some("/x")
/// normalize("/a/", "/b/./c")          -> Some("/b/c")
/// normalize("/", "..")                -> None
/// ```
pub fn normalize(relative_to: &str, path: &str) -> Option<String> {
    normalize_segments(relative_to, path).map(|segments| join_absolute(&segments))
}

/// Join segments into an absolute path.
pub fn join_absolute(segments: &[&str]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::with_capacity(segments.iter().map(|s| s.len() + 1).sum());
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Directory part of a path: everything up to and including the last `/`.
///
/// Paths without a slash yield `/`.
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[..=pos],
        None => "/",
    }
}

/// Re-express `path` (relative to directory `from_dir`) as a path relative
/// to directory `to_dir`, using `..` segments as needed.
///
/// Returns `None` if `path` climbs above the root.
///
/// # Examples
/// ```ignore
/// translate_relative("/lib/widgets/", "/pages/", "img/a.png") -> Some("../lib/widgets/img/a.png")
/// translate_relative("/a/b/", "/a/", "c.css")                 -> Some("b/c.css")
/// ```
pub fn translate_relative(from_dir: &str, to_dir: &str, path: &str) -> Option<String> {
    let from = normalize_segments(from_dir, path)?;
    let to: Vec<&str> = split_path(to_dir).collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut target: Vec<&str> = Vec::with_capacity(to.len() - common + from.len() - common);
    target.extend(std::iter::repeat_n("..", to.len() - common));
    target.extend_from_slice(&from[common..]);

    Some(target.join("/"))
}

// ============================================================================
// Tests
// ============================================================================
