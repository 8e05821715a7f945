//! Resolved asset paths.
//!
//! An [`AssetPath`] is a [`LogicalPath`] split at its mount point, with each
//! remainder segment percent-decoded and validated. The last segment may carry
//! request parameters between `$` markers, right before the extension:
//!
//! ```text
//! /cdn/loader$profile=mobile&debug$.js
//!      ^^^^^^ ^^^^^^^^^^^^^^^^^^^^ ^^^
//!      base   parameters           extension  -> /cdn/loader.js
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::core::{LogicalPath, join_absolute};

static PARAMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([^$]*)\$((?:\.[A-Za-z0-9]+)+)$").unwrap());

/// Characters that may never appear in a path segment.
const INVALID_CHARS: [char; 9] = ['\\', '/', ':', '"', '\'', '<', '>', '|', '?'];

/// Segment names reserved by some filesystems.
const RESERVED_NAMES: [&str; 4] = ["CON", "PRN", "AUX", "NUL"];

/// A logical path resolved against a mount point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetPath {
    mount_point: LogicalPath,
    remainder: Vec<String>,
    full: LogicalPath,
    identity: String,
    param_string: Option<String>,
    params: BTreeMap<String, String>,
}

impl AssetPath {
    /// Build from a mount point and the (still encoded) remainder segments.
    ///
    /// Returns `None` if a segment does not decode or is not a valid name.
    pub fn new<'a>(
        mount_point: LogicalPath,
        remainder: impl IntoIterator<Item = &'a str>,
    ) -> Option<Self> {
        let mut decoded: Vec<String> = remainder
            .into_iter()
            .map(decode_segment)
            .collect::<Option<_>>()?;

        let mut param_string = None;
        let mut original_last = None;
        if let Some(last) = decoded.last_mut()
            && let Some(caps) = PARAMS_RE.captures(last)
            && let (Some(whole), Some(params), Some(ext)) = (caps.get(0), caps.get(1), caps.get(2))
        {
            let stripped = format!("{}{}", &last[..whole.start()], ext.as_str());
            param_string = Some(params.as_str().to_string());
            original_last = Some(std::mem::replace(last, stripped));
        }

        if !decoded.iter().all(|s| is_valid_segment(s)) {
            return None;
        }

        let mut segments: Vec<&str> = mount_point.segments().collect();
        segments.extend(decoded.iter().map(String::as_str));
        let full = LogicalPath::parse(&join_absolute(&segments))?;

        let identity = match &original_last {
            Some(original) => format!("{}{}", full.dirname(), original),
            None => full.as_str().to_string(),
        };
        let params = param_string.as_deref().map(parse_params).unwrap_or_default();

        Some(Self {
            mount_point,
            remainder: decoded,
            full,
            identity,
            param_string,
            params,
        })
    }

    /// Mount point this path was resolved under.
    pub fn mount_point(&self) -> &LogicalPath {
        &self.mount_point
    }

    /// Decoded segments below the mount point (parameters stripped).
    pub fn remainder(&self) -> &[String] {
        &self.remainder
    }

    /// Full logical path, parameters stripped.
    pub fn full_path(&self) -> &LogicalPath {
        &self.full
    }

    pub fn base_name(&self) -> &str {
        self.full.base_name()
    }

    /// The path including its parameter block, as used for cache identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn param_string(&self) -> Option<&str> {
        self.param_string.as_deref()
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity)
    }
}

fn decode_segment(segment: &str) -> Option<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

/// Whether a decoded segment is a legal resource name.
pub fn is_valid_segment(segment: &str) -> bool {
    if segment.is_empty() || segment == "." || segment == ".." {
        return false;
    }
    if segment
        .chars()
        .any(|c| c.is_control() || c == '*' || INVALID_CHARS.contains(&c))
    {
        return false;
    }
    !is_reserved_name(segment)
}

fn is_reserved_name(segment: &str) -> bool {
    let upper = segment.to_ascii_uppercase();
    if RESERVED_NAMES.contains(&upper.as_str()) {
        return true;
    }
    let bytes = upper.as_bytes();
    bytes.len() == 4
        && (upper.starts_with("COM") || upper.starts_with("LPT"))
        && bytes[3].is_ascii_digit()
}

/// Parse `a=1&b=two+words&flag` into a map. Names without `=` map to `""`.
pub fn parse_params(raw: &str) -> BTreeMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_form(name), decode_form(value))
        })
        .collect()
}

fn decode_form(s: &str) -> String {
    let spaced = s.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
