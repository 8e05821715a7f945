//! MIME type detection utilities.
//!
//! Types are bare (no `charset` parameter); the charset is appended by
//! [`content_type`] from the encoding of the asset being served.

use std::path::Path;

use crate::core::Encoding;

/// Common MIME type constants.
pub mod types {
    // Text
    pub const HTML: &str = "text/html";
    pub const PLAIN: &str = "text/plain";
    pub const CSS: &str = "text/css";
    pub const JAVASCRIPT: &str = "text/javascript";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const MARKDOWN: &str = "text/markdown";
    pub const CSV: &str = "text/csv";
    pub const SVG: &str = "image/svg+xml";

    // Binary
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const PDF: &str = "application/pdf";
    pub const WASM: &str = "application/wasm";
    pub const ZIP: &str = "application/zip";

    // Images
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const ICO: &str = "image/x-icon";

    // Media
    pub const MP3: &str = "audio/mpeg";
    pub const MP4: &str = "video/mp4";

    // Fonts
    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
}

/// Guess MIME type from a file name or path.
pub fn from_path(path: &Path) -> &'static str {
    from_extension(path.extension().and_then(|e| e.to_str()))
}

/// Guess MIME type from the last extension of a logical name.
pub fn from_name(name: &str) -> &'static str {
    from_extension(name.rsplit_once('.').map(|(_, ext)| ext))
}

/// Guess MIME type from file extension string.
pub fn from_extension(ext: Option<&str>) -> &'static str {
    let ext = ext.map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm" | "xhtml") => types::HTML,
        Some("css") => types::CSS,
        Some("js" | "mjs" | "cjs") => types::JAVASCRIPT,
        Some("json" | "map") => types::JSON,
        Some("xml" | "xsl") => types::XML,
        Some("txt" | "text" | "ejs") => types::PLAIN,
        Some("md") => types::MARKDOWN,
        Some("csv") => types::CSV,
        Some("svg") => types::SVG,

        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("gif") => types::GIF,
        Some("webp") => types::WEBP,
        Some("ico") => types::ICO,

        Some("mp3") => types::MP3,
        Some("mp4" | "m4v") => types::MP4,

        Some("woff") => types::WOFF,
        Some("woff2") => types::WOFF2,
        Some("ttf") => types::TTF,

        Some("pdf") => types::PDF,
        Some("wasm") => types::WASM,
        Some("zip") => types::ZIP,

        _ => types::OCTET_STREAM,
    }
}

/// Check if the MIME type represents text content.
pub fn is_text(mime: &str) -> bool {
    mime.starts_with("text/") || mime == types::JSON || mime == types::XML || mime == types::SVG
}

/// Full `Content-Type` header value, with charset for textual types.
pub fn content_type(mime: &str, encoding: Option<Encoding>) -> String {
    match encoding {
        Some(encoding) if is_text(mime) => format!("{mime}; charset={}", encoding.name()),
        _ => mime.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_path() {
        assert_eq!(from_path(&PathBuf::from("index.html")), types::HTML);
        assert_eq!(from_path(&PathBuf::from("style.css")), types::CSS);
        assert_eq!(from_path(&PathBuf::from("app.js")), types::JAVASCRIPT);
        assert_eq!(from_path(&PathBuf::from("logo.PNG")), types::PNG);
        assert_eq!(from_path(&PathBuf::from("unknown.xyz")), types::OCTET_STREAM);
        assert_eq!(from_path(&PathBuf::from("README")), types::OCTET_STREAM);
    }

    #[test]
    fn test_from_name_uses_last_extension() {
        assert_eq!(from_name("widgets.ejs.js"), types::JAVASCRIPT);
        assert_eq!(from_name("page.html"), types::HTML);
        assert_eq!(from_name("noext"), types::OCTET_STREAM);
    }

    #[test]
    fn test_is_text() {
        assert!(is_text(types::HTML));
        assert!(is_text(types::JSON));
        assert!(is_text(types::SVG));
        assert!(!is_text(types::PNG));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(
            content_type(types::CSS, Some(Encoding::Utf8)),
            "text/css; charset=UTF-8"
        );
        assert_eq!(content_type(types::PNG, Some(Encoding::Utf8)), "image/png");
        assert_eq!(content_type(types::HTML, None), "text/html");
    }
}
