//! [`MarkupPacker`] backed by the `tl` HTML parser.

use super::tree::{Content, Element};
use super::{MarkupPacker, PackerHandle};
use crate::error::{AssetError, Result};
use crate::utils::escape::unescape_entities;

/// Parses with `tl` into an owned [`Element`] tree.
///
/// The root is the `body` element when there is one, otherwise a synthetic
/// element holding the top-level nodes. Comments are dropped, tag and
/// attribute names are lowercased and entities are decoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct TlPacker;

impl MarkupPacker for TlPacker {
    fn create(&self, markup: &str, source: &str) -> Result<PackerHandle> {
        let Ok(dom) = tl::parse(markup, tl::ParserOptions::default()) else {
            return Err(AssetError::evaluation(source, "cannot parse markup"));
        };

        let parser = dom.parser();
        let mut root = Element::new("#root");
        for handle in dom.children() {
            if let Some(node) = convert(*handle, parser) {
                root.children.push(node);
            }
        }

        let root = match root.find(&|e| e.name == "body") {
            Some(body) => body.clone(),
            None => root,
        };
        Ok(PackerHandle::new(root))
    }
}

fn convert(handle: tl::NodeHandle, parser: &tl::Parser) -> Option<Content> {
    match handle.get(parser)? {
        tl::Node::Tag(tag) => {
            let mut element = Element::new(tag.name().as_utf8_str().to_lowercase());

            for (key, value) in tag.attributes().iter() {
                let value = value.map(|v| unescape_entities(&v).into_owned());
                element
                    .attributes
                    .push((key.to_lowercase(), value.unwrap_or_default()));
            }
            element.attributes.sort_by(|a, b| a.0.cmp(&b.0));

            for child in tag.children().top().iter() {
                if let Some(node) = convert(*child, parser) {
                    element.children.push(node);
                }
            }
            Some(Content::Element(element))
        }
        tl::Node::Raw(bytes) => {
            let text = bytes.as_utf8_str();
            (!text.is_empty()).then(|| Content::Text(unescape_entities(&text).into_owned()))
        }
        tl::Node::Comment(_) => None,
    }
}
