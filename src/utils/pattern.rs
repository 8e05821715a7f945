//! Glob-style name and path patterns.
//!
//! - [`NamePattern`]: matches a single path segment (`*` and `?` wildcards)
//! - [`PathPattern`]: matches a whole logical path, `**` spans segments

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Names excluded from every directory mount.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "*~",
    "#*#",
    ".#*",
    "%*%",
    "._*",
    "CVS",
    ".cvsignore",
    "SCCS",
    "vssver.scc",
    ".svn",
    ".DS_Store",
    ".git",
    ".gitattributes",
    ".gitignore",
    ".gitmodules",
    ".hg",
    ".hgignore",
    ".hgsub",
    ".hgsubstate",
    ".hgtags",
    ".bzr",
    ".bzrignore",
];

static DEFAULT_EXCLUDE_PATTERN: LazyLock<NamePattern> =
    LazyLock::new(|| NamePattern::new(DEFAULT_EXCLUDES.iter().copied()).unwrap());

/// Whether a glob contains wildcard characters.
#[inline]
pub fn has_wildcards(glob: &str) -> bool {
    glob.contains(['*', '?'])
}

/// Translate one glob segment into regex source (unanchored).
fn segment_regex(glob: &str, star: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    let mut literal = String::new();
    for c in glob.chars() {
        match c {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if c == '*' { star } else { "." });
            }
            _ => literal.push(c),
        }
    }
    out.push_str(&regex::escape(&literal));
    out
}

// ============================================================================
// NamePattern
// ============================================================================

/// A set of anchored glob alternatives matched against single names.
#[derive(Clone)]
pub struct NamePattern {
    globs: Vec<String>,
    regex: Option<Regex>,
}

impl NamePattern {
    /// Compile a set of globs. An empty set never matches.
    pub fn new<'a>(globs: impl IntoIterator<Item = &'a str>) -> Result<Self, regex::Error> {
        let globs: Vec<String> = globs.into_iter().map(str::to_string).collect();
        if globs.is_empty() {
            return Ok(Self::never());
        }
        let alternatives: Vec<String> = globs
            .iter()
            .map(|g| format!("(?:{})", segment_regex(g, ".*")))
            .collect();
        let regex = Regex::new(&format!("^(?:{})$", alternatives.join("|")))?;
        Ok(Self {
            globs,
            regex: Some(regex),
        })
    }

    /// Pattern that matches nothing.
    pub const fn never() -> Self {
        Self {
            globs: Vec::new(),
            regex: None,
        }
    }

    /// The built-in exclusion list (version control metadata, editor backups).
    pub fn default_excludes() -> &'static Self {
        &DEFAULT_EXCLUDE_PATTERN
    }

    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(name))
    }

    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }

    pub fn globs(&self) -> &[String] {
        &self.globs
    }
}

impl fmt::Debug for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamePattern").field(&self.globs).finish()
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.globs.join(","))
    }
}

// ============================================================================
// PathPattern
// ============================================================================

/// Glob over a full logical path.
///
/// `*` and `?` stay within one segment; a `**` segment matches any number of
/// whole segments (including none).
#[derive(Clone)]
pub struct PathPattern {
    glob: String,
    regex: Regex,
}

impl PathPattern {
    pub fn new(glob: &str) -> Result<Self, regex::Error> {
        let segments: Vec<&str> = glob
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let mut source = String::from("^/");
        for (i, segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            if *segment == "**" {
                source.push_str(if last { ".*" } else { "(?:[^/]+/)*" });
            } else {
                source.push_str(&segment_regex(segment, "[^/]*"));
                if !last {
                    source.push('/');
                }
            }
        }
        source.push('$');

        Ok(Self {
            glob: glob.to_string(),
            regex: Regex::new(&source)?,
        })
    }

    #[inline]
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathPattern").field(&self.glob).finish()
    }
}
