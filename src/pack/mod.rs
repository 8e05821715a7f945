//! Fragment packer: markup to a compact script array literal.
//!
//! # Module Structure
//!
//! - [`tree`]: owned element tree and the packed notation
//! - [`tl_packer`]: the `tl`-backed parser
//!
//! A packer is created per markup string; the handle it returns narrows to
//! one element (first child, id or attribute) and packs it. An empty
//! selection packs to `[]`.

mod tl_packer;
mod tree;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use tl_packer::TlPacker;
pub use tree::{Content, Element};

use crate::error::{AssetError, Missing, Result};

/// Parses markup into a [`PackerHandle`].
pub trait MarkupPacker: Send + Sync + fmt::Debug {
    /// `source` names where the markup came from, for error messages.
    fn create(&self, markup: &str, source: &str) -> Result<PackerHandle>;
}

/// A parsed document narrowed to at most one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackerHandle {
    selection: Option<Element>,
}

impl PackerHandle {
    pub fn new(root: Element) -> Self {
        Self {
            selection: Some(root),
        }
    }

    /// A handle with nothing selected.
    pub fn empty() -> Self {
        Self { selection: None }
    }

    pub fn selection(&self) -> Option<&Element> {
        self.selection.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.selection.is_none()
    }

    fn narrow(&self, pick: impl FnOnce(&Element) -> Option<&Element>) -> Self {
        Self {
            selection: self.selection.as_ref().and_then(pick).cloned(),
        }
    }

    pub fn select_first_child(&self) -> Self {
        self.narrow(|e| e.elements().next())
    }

    pub fn select_by_id(&self, id: &str) -> Self {
        self.select_by_attribute("id", id)
    }

    /// First descendant, depth first, whose `name` attribute equals `value`.
    pub fn select_by_attribute(&self, name: &str, value: &str) -> Self {
        self.narrow(|e| e.find(&|candidate| candidate.attribute(name) == Some(value)))
    }

    pub fn pack(&self) -> String {
        match &self.selection {
            Some(element) => element.pack(),
            None => "[]".to_string(),
        }
    }
}

/// How a fragment locator names an element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Addressing {
    /// Match the configured attribute (`fragment` unless overridden).
    #[default]
    Attribute,
    /// Match the `id` attribute.
    Id,
}

/// Pack the element of `markup` named by `locator`.
///
/// Without a locator the first element child of the root is packed. A
/// locator that matches nothing is a not-found error naming the locator and
/// `source`.
pub fn pack_fragment(
    packer: &dyn MarkupPacker,
    markup: &str,
    locator: Option<&str>,
    addressing: Addressing,
    attribute: &str,
    source: &str,
) -> Result<String> {
    let handle = packer.create(markup, source)?;
    let Some(locator) = locator else {
        return Ok(handle.select_first_child().pack());
    };

    let selected = match addressing {
        Addressing::Attribute => handle.select_by_attribute(attribute, locator),
        Addressing::Id => handle.select_by_id(locator),
    };
    if selected.is_empty() {
        return Err(AssetError::not_found(Missing::Element, locator, source));
    }
    Ok(selected.pack())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(markup: &str) -> String {
        pack_fragment(&TlPacker, markup, None, Addressing::Attribute, "fragment", "test").unwrap()
    }

    mod packing {
        use super::*;

        #[test]
        fn bare_element() {
            assert_eq!(first("<p></p>"), "['p']");
        }

        #[test]
        fn id_and_class_fold_into_head() {
            assert_eq!(
                first(r#"<p id="myid" class=" class1"></p>"#),
                "['p#myid.class1']"
            );
            assert_eq!(
                first(r#"<p class="class1 class2"></p>"#),
                "['p.class1.class2']"
            );
        }

        #[test]
        fn other_attributes() {
            assert_eq!(
                first(r#"<div someattr="somevalue"></div>"#),
                "['div','@someattr','somevalue']"
            );
            assert_eq!(
                first(r#"<input type="submit">"#),
                "['input','@type','submit']"
            );
        }

        #[test]
        fn nested_elements_and_text() {
            assert_eq!(first("<tr><td>col1</td></tr>"), "['tr',['td','col1']]");
        }

        #[test]
        fn whitespace_and_at_signs() {
            assert_eq!(
                first("<p><b>x</b> <i>y</i> </p>"),
                "['p',['b','x'],0,['i','y'],0]"
            );
            assert_eq!(first("<p>@me</p>"), "['p','@@me']");
            assert_eq!(first("<p>a <b>b</b> c</p>"), "['p','a ',['b','b'],' c']");
        }

        #[test]
        fn comments_dropped_entities_decoded() {
            assert_eq!(first("<p><!-- x -->a &amp; b</p>"), "['p','a & b']");
        }

        #[test]
        fn body_is_the_root() {
            let html = "<html><head><title>t</title></head><body><ul></ul></body></html>";
            assert_eq!(first(html), "['ul']");
        }
    }

    mod selection {
        use super::*;

        const PAGE: &str = r#"<div><section fragment="menu" id="m"><a>1</a></section></div>"#;

        #[test]
        fn by_attribute_and_id() {
            let by_attr = pack_fragment(
                &TlPacker,
                PAGE,
                Some("menu"),
                Addressing::Attribute,
                "fragment",
                "page.html",
            )
            .unwrap();
            assert_eq!(by_attr, "['section#m','@fragment','menu',['a','1']]");

            let by_id =
                pack_fragment(&TlPacker, PAGE, Some("m"), Addressing::Id, "fragment", "page.html")
                    .unwrap();
            assert_eq!(by_id, by_attr);
        }

        #[test]
        fn missing_locator_names_locator_and_source() {
            let err = pack_fragment(
                &TlPacker,
                PAGE,
                Some("footer"),
                Addressing::Attribute,
                "fragment",
                "/views/page.html",
            )
            .unwrap_err();
            assert!(err.is_not_found());
            let message = err.to_string();
            assert!(message.contains("footer"));
            assert!(message.contains("/views/page.html"));
        }

        #[test]
        fn missing_id_names_locator_and_source() {
            let err = pack_fragment(
                &TlPacker,
                "<div>x</div>",
                Some("missing"),
                Addressing::Id,
                "fragment",
                "/views/x.html",
            )
            .unwrap_err();
            assert!(matches!(
                &err,
                AssetError::NotFound {
                    what: Missing::Element,
                    ..
                }
            ));
            let message = err.to_string();
            assert!(message.contains("missing"));
            assert!(message.contains("/views/x.html"));
        }

        #[test]
        fn empty_selection_packs_to_empty_array() {
            let handle = TlPacker.create("", "empty").unwrap();
            assert_eq!(handle.select_first_child().pack(), "[]");
            assert_eq!(PackerHandle::empty().select_by_id("x").pack(), "[]");
        }
    }
}
