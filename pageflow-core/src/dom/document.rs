//! The document: a root element with guaranteed head and body.

use super::node::{Element, Node};
use crate::types::DomNodeId;
use parking_lot::RwLock;
use std::sync::Arc;

/// A parsed document.
///
/// Invariant: the root is an `html` element with exactly one `head` and
/// one `body` child; all constructors enforce this.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Element,
}

/// The live document, shared between the host and the engine.
pub type SharedDocument = Arc<RwLock<Document>>;

/// Wrap a document for sharing.
#[must_use]
pub fn shared(doc: Document) -> SharedDocument {
    Arc::new(RwLock::new(doc))
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document: `<html><head></head><body></body></html>`.
    #[must_use]
    pub fn new() -> Self {
        let root = Element::new("html")
            .with_child(Element::new("head"))
            .with_child(Element::new("body"));
        Self { root }
    }

    /// Build a document from a root element, inserting an empty head
    /// and/or body when missing. Non-head, non-body children of the root
    /// are moved into the body.
    #[must_use]
    pub fn from_root(root: Element) -> Self {
        let mut head: Option<Element> = None;
        let mut body: Option<Element> = None;
        let mut strays: Vec<Node> = Vec::new();

        let mut shell = Element::new("html");
        shell.set_attributes(root.attributes().to_vec());

        for child in root.children().iter().cloned() {
            match child {
                Node::Element(el) if el.tag() == "head" && head.is_none() => head = Some(el),
                Node::Element(el) if el.tag() == "body" && body.is_none() => body = Some(el),
                Node::Text(text) if text.trim().is_empty() => {}
                other => strays.push(other),
            }
        }

        let mut body = body.unwrap_or_else(|| Element::new("body"));
        for stray in strays {
            body.push_child(stray);
        }

        shell.push_child(Node::Element(head.unwrap_or_else(|| Element::new("head"))));
        shell.push_child(Node::Element(body));
        Self { root: shell }
    }

    /// The root (`html`) element.
    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The root element, mutably.
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// The `head` element.
    #[must_use]
    pub fn head(&self) -> &Element {
        self.root
            .children()
            .iter()
            .filter_map(Node::as_element)
            .find(|el| el.tag() == "head")
            .expect("document always has a head")
    }

    /// The `head` element, mutably.
    pub fn head_mut(&mut self) -> &mut Element {
        self.root
            .children_mut()
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find(|el| el.tag() == "head")
            .expect("document always has a head")
    }

    /// The `body` element.
    #[must_use]
    pub fn body(&self) -> &Element {
        self.root
            .children()
            .iter()
            .filter_map(Node::as_element)
            .find(|el| el.tag() == "body")
            .expect("document always has a body")
    }

    /// The `body` element, mutably.
    pub fn body_mut(&mut self) -> &mut Element {
        self.root
            .children_mut()
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find(|el| el.tag() == "body")
            .expect("document always has a body")
    }

    /// Swap the body wholesale for a new one.
    pub fn set_body(&mut self, body: Element) {
        for child in self.root.children_mut() {
            if let Node::Element(el) = child {
                if el.tag() == "body" {
                    *child = Node::Element(body);
                    return;
                }
            }
        }
        self.root.push_child(Node::Element(body));
    }

    /// Find an element anywhere in the document by id.
    #[must_use]
    pub fn find(&self, id: DomNodeId) -> Option<&Element> {
        self.root.find(id)
    }

    /// Find an element anywhere in the document by id, mutably.
    pub fn find_mut(&mut self, id: DomNodeId) -> Option<&mut Element> {
        self.root.find_mut(id)
    }

    /// Replace an element anywhere in the document by id.
    pub fn replace(&mut self, id: DomNodeId, replacement: Element) -> bool {
        self.root.replace_descendant(id, replacement)
    }

    /// Nodes taking part in deferred execution (plain scripts and import
    /// links), in document order.
    #[must_use]
    pub fn deferrable_nodes(&self) -> Vec<&Element> {
        self.root
            .descendants()
            .into_iter()
            .filter(|el| el.is_deferrable())
            .collect()
    }

    /// Neutralized nodes awaiting replay, in document order.
    #[must_use]
    pub fn neutralized_nodes(&self) -> Vec<&Element> {
        self.root
            .descendants()
            .into_iter()
            .filter(|el| el.is_neutralized())
            .collect()
    }

    /// Serialize the whole document.
    #[must_use]
    pub fn outer_html(&self) -> String {
        self.root.outer_html()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_has_head_and_body() {
        let doc = Document::new();
        assert_eq!(doc.head().tag(), "head");
        assert_eq!(doc.body().tag(), "body");
    }

    #[test]
    fn from_root_supplies_missing_parts() {
        let root = Element::new("html").with_child(Element::new("p").with_text("stray"));
        let doc = Document::from_root(root);
        assert!(doc.head().children().is_empty());
        assert_eq!(doc.body().child_elements().len(), 1);
        assert_eq!(doc.body().text_content(), "stray");
    }

    #[test]
    fn set_body_swaps_in_place() {
        let mut doc = Document::new();
        let body = Element::new("body").with_attr("class", "next");
        doc.set_body(body);
        assert_eq!(doc.body().attr("class"), Some("next"));
        // head is untouched and still first
        assert_eq!(doc.root().child_elements()[0].tag(), "head");
    }

    #[test]
    fn deferrable_nodes_in_document_order() {
        let doc = Document::from_root(
            Element::new("html")
                .with_child(
                    Element::new("head")
                        .with_child(Element::new("script").with_attr("src", "/head.js")),
                )
                .with_child(
                    Element::new("body")
                        .with_child(Element::new("script").with_attr("src", "/a.js"))
                        .with_child(Element::new("script").with_attr("type", "module"))
                        .with_child(Element::new("link").with_attr("rel", "import").with_attr("href", "/p.html")),
                ),
        );
        let urls: Vec<_> = doc
            .deferrable_nodes()
            .iter()
            .map(|el| el.resource_url().unwrap_or("").to_string())
            .collect();
        assert_eq!(urls, vec!["/head.js", "/a.js", "/p.html"]);
    }
}
