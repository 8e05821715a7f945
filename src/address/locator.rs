//! Resource handles.
//!
//! A [`Locator`] is what a store hands back for a resolved path: where the
//! bytes live, how to interpret them, and how to notice when they change.
//! Filters consume one locator and produce another.

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::Encoding;
use crate::error::{AssetError, Result};
use crate::freshness::{ContentHash, Probe, hash_bytes};
use crate::utils::mime;

/// Where a locator's bytes come from.
#[derive(Clone)]
pub enum Body {
    File(PathBuf),
    Buffer(Arc<[u8]>),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
        }
    }
}

/// Handle to a physical or in-memory resource.
#[derive(Debug, Clone)]
pub struct Locator {
    name: Arc<str>,
    body: Body,
    content_type: &'static str,
    encoding: Option<Encoding>,
    should_cache: bool,
    probe: Option<Arc<dyn Probe>>,
}

impl Locator {
    /// Locator for a file on disk. Content type is guessed from `name`.
    pub fn file(name: impl Into<Arc<str>>, path: impl Into<PathBuf>) -> Self {
        Self::with_body(name.into(), Body::File(path.into()))
    }

    /// Locator for in-memory content. Content type is guessed from `name`.
    pub fn buffer(name: impl Into<Arc<str>>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::with_body(name.into(), Body::Buffer(bytes.into()))
    }

    fn with_body(name: Arc<str>, body: Body) -> Self {
        let content_type = mime::from_name(&name);
        Self {
            name,
            body,
            content_type,
            encoding: None,
            should_cache: true,
            probe: None,
        }
    }

    /// A new in-memory locator carrying this one's name, type and encoding.
    ///
    /// Used by filters to hand on transformed content.
    pub fn derive(&self, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: self.name.clone(),
            body: Body::Buffer(bytes.into()),
            content_type: self.content_type,
            encoding: self.encoding,
            should_cache: self.should_cache,
            probe: None,
        }
    }

    /// Like [`derive`](Self::derive), encoding `text` with this locator's encoding.
    pub fn derive_text(&self, text: &str) -> Self {
        let encoding = self.encoding.unwrap_or_default();
        let mut derived = self.derive(encoding.encode(text));
        derived.encoding = Some(encoding);
        derived
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_encoding(mut self, encoding: Option<Encoding>) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Mark whether results derived from this locator may be cached.
    pub fn cacheable(mut self, should_cache: bool) -> Self {
        self.should_cache = should_cache;
        self
    }

    /// Logical name (the resolved path) of the resource.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// Declared encoding, if the resource is text.
    pub fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    pub fn should_cache(&self) -> bool {
        self.should_cache
    }

    pub fn probe(&self) -> Option<&Arc<dyn Probe>> {
        self.probe.as_ref()
    }

    /// Physical path, for file-backed locators.
    pub fn physical_path(&self) -> Option<&Path> {
        match &self.body {
            Body::File(path) => Some(path),
            Body::Buffer(_) => None,
        }
    }

    /// Read the raw bytes.
    pub fn bytes(&self) -> Result<Cow<'_, [u8]>> {
        match &self.body {
            Body::File(path) => fs::read(path)
                .map(Cow::Owned)
                .map_err(|e| AssetError::io(path, e)),
            Body::Buffer(bytes) => Ok(Cow::Borrowed(&bytes[..])),
        }
    }

    /// Read and decode as text.
    ///
    /// `encoding` overrides the declared encoding; UTF-8 is the fallback.
    pub fn text(&self, encoding: Option<Encoding>) -> Result<String> {
        let encoding = encoding.or(self.encoding).unwrap_or_default();
        let bytes = self.bytes()?;
        Ok(encoding.decode(&bytes).into_owned())
    }

    /// Hash of the current content.
    pub fn content_hash(&self) -> Result<ContentHash> {
        Ok(hash_bytes(&self.bytes()?))
    }

    /// Load file content into memory, keeping all other properties.
    pub fn into_buffered(self) -> Result<Self> {
        match self.body {
            Body::Buffer(_) => Ok(self),
            Body::File(_) => {
                let bytes: Arc<[u8]> = self.bytes()?.into_owned().into();
                Ok(Self {
                    body: Body::Buffer(bytes),
                    ..self
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freshness::{FileProbe, SignatureMode};
    use tempfile::TempDir;

    #[test]
    fn buffer_text_uses_declared_encoding() {
        let loc = Locator::buffer("/a.txt", vec![0x63, 0x61, 0x66, 0xE9])
            .with_encoding(Some(Encoding::Latin1));
        assert_eq!(loc.text(None).unwrap(), "café");
        assert_eq!(loc.content_type(), mime::types::PLAIN);
    }

    #[test]
    fn encoding_override_wins() {
        let loc = Locator::buffer("/a.txt", "café".as_bytes().to_vec())
            .with_encoding(Some(Encoding::Latin1));
        assert_eq!(loc.text(Some(Encoding::Utf8)).unwrap(), "café");
    }

    #[test]
    fn file_body_reads_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.css");
        fs::write(&path, "body{}").unwrap();

        let loc = Locator::file("/x.css", &path)
            .with_probe(Arc::new(FileProbe::new(&path, SignatureMode::Mtime)));
        assert_eq!(loc.content_type(), mime::types::CSS);
        assert_eq!(loc.text(None).unwrap(), "body{}");
        assert_eq!(loc.physical_path(), Some(path.as_path()));
        assert!(loc.probe().is_some());

        let buffered = loc.into_buffered().unwrap();
        assert!(buffered.physical_path().is_none());
        assert_eq!(&*buffered.bytes().unwrap(), b"body{}");
    }

    #[test]
    fn missing_file_is_io_error() {
        let loc = Locator::file("/gone.txt", "/nonexistent/gone.txt");
        assert!(matches!(loc.bytes(), Err(AssetError::Io { .. })));
    }

    #[test]
    fn derive_keeps_metadata_drops_probe() {
        let original = Locator::buffer("/page.html", b"<p>x</p>".to_vec())
            .with_encoding(Some(Encoding::Utf8))
            .with_probe(Arc::new(FileProbe::new("/p", SignatureMode::Mtime)))
            .cacheable(false);
        let derived = original.derive_text("<p>y</p>");
        assert_eq!(derived.name(), "/page.html");
        assert_eq!(derived.content_type(), mime::types::HTML);
        assert!(!derived.should_cache());
        assert!(derived.probe().is_none());
        assert_eq!(derived.text(None).unwrap(), "<p>y</p>");
    }
}
