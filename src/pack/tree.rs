//! Owned element tree and the packed array notation.
//!
//! ```text
//! <div id="nav" class="menu wide" role="list"> Home <b>x</b></div>
//!   ──► ['div#nav.menu.wide','@role','list','Home',['b','x']]
//! ```
//!
//! - the head is the tag name, then `#id`, then `.class` per class
//! - other attributes follow as `'@name','value'` pairs, sorted by name
//! - text is a script string literal; text starting with `@` gets a second `@`
//! - whitespace-only text is folded into the next text as one leading space,
//!   or emitted as `0` when an element or the end follows

use crate::utils::escape::escape_for_script;

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// Sorted by name.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Content>,
}

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Element(Element),
    Text(String),
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Attribute value, name compared ignoring ASCII case.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Content::Element(element) => Some(element),
            Content::Text(_) => None,
        })
    }

    /// Depth-first search over descendants, excluding `self`.
    pub fn find(&self, predicate: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        for child in self.elements() {
            if predicate(child) {
                return Some(child);
            }
            if let Some(found) = child.find(predicate) {
                return Some(found);
            }
        }
        None
    }

    /// `name#id.class1.class2`
    fn head(&self) -> String {
        let mut head = self.name.clone();
        if let Some(id) = self.attribute("id") {
            head.push('#');
            head.push_str(id);
        }
        if let Some(class) = self.attribute("class") {
            for name in class.split_whitespace() {
                head.push('.');
                head.push_str(name);
            }
        }
        head
    }

    /// Append the packed form of this element to `out`.
    pub fn pack_into(&self, out: &mut String) {
        out.push('[');
        push_literal(out, &self.head());

        for (name, value) in &self.attributes {
            if name.eq_ignore_ascii_case("id") || name.eq_ignore_ascii_case("class") {
                continue;
            }
            out.push(',');
            push_literal(out, &format!("@{name}"));
            out.push(',');
            push_literal(out, value);
        }

        let mut pending_space = false;
        for child in &self.children {
            match child {
                Content::Element(element) => {
                    if pending_space {
                        out.push_str(",0");
                        pending_space = false;
                    }
                    out.push(',');
                    element.pack_into(out);
                }
                Content::Text(text) if is_blank(text) => pending_space = true,
                Content::Text(text) => {
                    out.push(',');
                    if pending_space {
                        push_literal(out, &format!(" {text}"));
                        pending_space = false;
                    } else if text.starts_with('@') {
                        push_literal(out, &format!("@{text}"));
                    } else {
                        push_literal(out, text);
                    }
                }
            }
        }
        if pending_space {
            out.push_str(",0");
        }

        out.push(']');
    }

    pub fn pack(&self) -> String {
        let mut out = String::new();
        self.pack_into(&mut out);
        out
    }
}

fn is_blank(text: &str) -> bool {
    !text.is_empty() && text.chars().all(char::is_whitespace)
}

fn push_literal(out: &mut String, text: &str) {
    out.push('\'');
    out.push_str(&escape_for_script(text));
    out.push('\'');
}
