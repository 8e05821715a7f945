//! Text escaping for the contexts templates write into.
//!
//! - `escape_for_script()` - script string literal bodies
//! - `escape_for_markup()` - HTML text and attribute values
//! - `escape_for_xml()` - XML text and attribute values
//! - `unescape_entities()` - decode HTML entities back to characters
//!
//! All return `Cow` to avoid allocation when nothing needs escaping.

use std::borrow::Cow;
use std::fmt::Write;

// =============================================================================
// Script
// =============================================================================

#[inline]
fn needs_script_escape(c: char) -> bool {
    matches!(c, '\'' | '"' | '\\' | '/') || !(' '..='\x7e').contains(&c)
}

/// Escape text for embedding inside a single- or double-quoted script string.
///
/// Quotes, backslash and `/` are backslash-escaped, common control characters
/// use their short escapes, everything else outside printable ASCII becomes
/// `\uXXXX` (surrogate pairs above the BMP).
///
/// # Example
/// ```ignore
/// assert_eq!(escape_for_script("it's </b>"), r"it\'s <\/b>");
/// ```
pub fn escape_for_script(s: &str) -> Cow<'_, str> {
    if !s.contains(needs_script_escape) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            '\u{8}' => out.push_str("\\b"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if (' '..='\x7e').contains(&c) => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04X}", unit);
                }
            }
        }
    }
    Cow::Owned(out)
}

// =============================================================================
// Markup
// =============================================================================

/// Characters that require HTML escaping.
const MARKUP_CHARS: [char; 5] = ['<', '>', '&', '"', '\''];

/// Escape HTML special characters for text content and attribute values.
///
/// # Example
/// ```ignore
/// assert_eq!(escape_for_markup("<script>"), "&lt;script&gt;");
/// assert_eq!(escape_for_markup("hello"), "hello"); // No allocation
/// ```
pub fn escape_for_markup(s: &str) -> Cow<'_, str> {
    if !s.contains(MARKUP_CHARS) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            c => result.push(c),
        }
    }
    Cow::Owned(result)
}

// =============================================================================
// XML
// =============================================================================

/// Escape the five XML special characters (`&apos;` for the single quote).
#[inline]
pub fn escape_for_xml(s: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(s)
}

// =============================================================================
// Unescape
// =============================================================================

/// Unescape HTML entities back to characters.
///
/// Handles common named entities and numeric character references; anything
/// unrecognized is kept verbatim.
pub fn unescape_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest[1..]
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&rest[1..=end]).map(|c| (c, end + 2)));

        match decoded {
            Some((c, consumed)) => {
                result.push(c);
                rest = &rest[consumed..];
            }
            None => {
                result.push('&');
                rest = &rest[1..];
            }
        }
    }
    result.push_str(rest);

    Cow::Owned(result)
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        s if s.starts_with("#x") || s.starts_with("#X") => {
            u32::from_str_radix(&s[2..], 16).ok().and_then(char::from_u32)
        }
        s if s.starts_with('#') => s[1..].parse().ok().and_then(char::from_u32),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod script {
        use super::*;

        #[test]
        fn plain_text_borrowed() {
            assert!(matches!(escape_for_script("hello world"), Cow::Borrowed(_)));
        }

        #[test]
        fn quotes_and_slashes() {
            assert_eq!(escape_for_script(r#"it's "x" </b> \"#), r#"it\'s \"x\" <\/b> \\"#);
        }

        #[test]
        fn control_characters() {
            assert_eq!(escape_for_script("a\nb\tc\r"), "a\\nb\\tc\\r");
            assert_eq!(escape_for_script("\u{1}"), "\\u0001");
        }

        #[test]
        fn non_ascii() {
            assert_eq!(escape_for_script("café"), "caf\\u00E9");
            assert_eq!(escape_for_script("😀"), "\\uD83D\\uDE00");
        }
    }

    mod markup {
        use super::*;

        #[test]
        fn special_characters() {
            assert_eq!(escape_for_markup("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        }

        #[test]
        fn no_escaping_needed() {
            assert!(matches!(escape_for_markup("plain"), Cow::Borrowed(_)));
        }
    }

    mod xml {
        use super::*;

        #[test]
        fn five_entities() {
            assert_eq!(escape_for_xml("<a b='c'>&\"</a>"), "&lt;a b=&apos;c&apos;&gt;&amp;&quot;&lt;/a&gt;");
        }
    }

    mod unescape {
        use super::*;

        #[test]
        fn named_and_numeric() {
            assert_eq!(unescape_entities("&lt;p&gt; &amp; &#65;&#x42;"), "<p> & AB");
        }

        #[test]
        fn unknown_kept() {
            assert_eq!(unescape_entities("a &bogus; b & c"), "a &bogus; b & c");
        }

        #[test]
        fn markup_roundtrip() {
            let original = "<b class=\"x\">Tom & Jerry's</b>";
            assert_eq!(unescape_entities(&escape_for_markup(original)), original);
        }
    }
}
