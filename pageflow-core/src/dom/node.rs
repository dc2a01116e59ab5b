//! Element and node types.

use crate::types::DomNodeId;
use std::fmt::Write as _;

/// Elements that never have a closing tag.
const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// A single name/value attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name, lowercased.
    pub name: String,
    /// Attribute value; empty for bare attributes.
    pub value: String,
}

impl Attribute {
    /// Create an attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            value: value.into(),
        }
    }

    /// The diff key for attribute reconciliation: name and value
    /// together, so a changed value reads as a different attribute.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}_{}", self.name, self.value)
    }
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An element with attributes and children.
    Element(Element),
    /// A text run, stored raw.
    Text(String),
    /// A comment, kept for fidelity but ignored by reconciliation.
    Comment(String),
}

impl Node {
    /// The node as an element, if it is one.
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(el) => Some(el),
            _ => None,
        }
    }

    /// The node as a mutable element, if it is one.
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Serialize the node back to markup.
    #[must_use]
    pub fn outer_html(&self) -> String {
        match self {
            Self::Element(el) => el.outer_html(),
            Self::Text(text) => text.clone(),
            Self::Comment(text) => format!("<!--{}-->", text),
        }
    }
}

/// A reference to a resource-bearing node, detached from the tree.
///
/// Used at async seams (readiness waits) where borrowing the document
/// would hold a lock across an await.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    /// The node's id in the live document.
    pub node: DomNodeId,
    /// The node's tag name.
    pub tag: String,
    /// The resource URL (`src` or `href`), if any.
    pub url: Option<String>,
}

/// An element: tag, ordered attributes, children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    id: DomNodeId,
    tag: String,
    attrs: Vec<Attribute>,
    children: Vec<Node>,
}

impl Element {
    /// Create an empty element with a fresh id.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            id: DomNodeId::next(),
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style text child.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Builder-style element child.
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// The element's stable id.
    #[must_use]
    pub fn id(&self) -> DomNodeId {
        self.id
    }

    /// The lowercased tag name.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The attribute list in document order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Get an attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Whether the attribute is present.
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Set an attribute, replacing any existing value in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attrs.push(Attribute { name, value }),
        }
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attr(&mut self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        let before = self.attrs.len();
        self.attrs.retain(|a| a.name != name);
        self.attrs.len() != before
    }

    /// Replace the whole attribute list.
    pub fn set_attributes(&mut self, attrs: Vec<Attribute>) {
        self.attrs = attrs;
    }

    /// Child nodes.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Mutable child nodes.
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Child elements only (the DOM `children` collection).
    #[must_use]
    pub fn child_elements(&self) -> Vec<&Element> {
        self.children.iter().filter_map(Node::as_element).collect()
    }

    /// Append a child node.
    pub fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Concatenated text content of the subtree.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
                Node::Comment(_) => {}
            }
        }
    }

    /// The resource URL of this node: `src`, else `href`.
    #[must_use]
    pub fn resource_url(&self) -> Option<&str> {
        self.attr("src").or_else(|| self.attr("href"))
    }

    /// A detached reference to this node for async waits.
    #[must_use]
    pub fn resource_ref(&self) -> ResourceRef {
        ResourceRef {
            node: self.id,
            tag: self.tag.clone(),
            url: self.resource_url().map(str::to_string),
        }
    }

    /// Whether this is a script that would execute on insertion:
    /// no `type` attribute, or `type="text/javascript"`.
    #[must_use]
    pub fn is_plain_script(&self) -> bool {
        self.tag == "script"
            && match self.attr("type") {
                None => true,
                Some(t) => t == "text/javascript",
            }
    }

    /// Whether this is an HTML import link.
    #[must_use]
    pub fn is_import_link(&self) -> bool {
        self.tag == "link" && self.attr("rel") == Some("import")
    }

    /// Whether this node takes part in deferred execution (a plain
    /// script or an import link).
    #[must_use]
    pub fn is_deferrable(&self) -> bool {
        self.is_plain_script() || self.is_import_link()
    }

    /// Whether this is a stylesheet link.
    #[must_use]
    pub fn is_stylesheet(&self) -> bool {
        self.tag == "link" && self.attr("rel") == Some("stylesheet")
    }

    /// Whether this node has been neutralized for deferred execution.
    #[must_use]
    pub fn is_neutralized(&self) -> bool {
        (self.tag == "script" && self.attr("type") == Some("none"))
            || (self.tag == "link" && self.attr("rel") == Some("none"))
    }

    /// Rewrite `type`/`rel` to inert values so the node cannot execute
    /// or load when inserted during the merge.
    pub fn neutralize(&mut self) {
        if self.tag == "script" {
            self.set_attr("type", "none");
        } else if self.tag == "link" {
            self.set_attr("rel", "none");
        }
    }

    /// Undo [`neutralize`](Self::neutralize): scripts lose their `type`
    /// marker, links become imports again.
    pub fn activate(&mut self) {
        if self.tag == "script" {
            self.remove_attr("type");
        } else if self.tag == "link" {
            self.set_attr("rel", "import");
        }
    }

    /// An activated copy with a fresh id, forcing re-execution when it
    /// replaces the neutralized original.
    #[must_use]
    pub fn activated_copy(&self) -> Element {
        let mut copy = self.clone();
        copy.id = DomNodeId::next();
        copy.activate();
        copy
    }

    /// The diff key for child reconciliation: tag + resource URL when a
    /// URL exists, else the full serialized markup.
    #[must_use]
    pub fn child_key(&self) -> String {
        match self.resource_url() {
            Some(url) => format!("{}_{}", self.tag.to_ascii_uppercase(), url),
            None => self.outer_html(),
        }
    }

    /// Find a descendant element (or self) by id.
    #[must_use]
    pub fn find(&self, id: DomNodeId) -> Option<&Element> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .iter()
            .filter_map(Node::as_element)
            .find_map(|el| el.find(id))
    }

    /// Find a descendant element (or self) by id, mutably.
    pub fn find_mut(&mut self, id: DomNodeId) -> Option<&mut Element> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find_map(|el| el.find_mut(id))
    }

    /// Replace the descendant element with the given id. Returns whether
    /// a replacement happened.
    pub fn replace_descendant(&mut self, id: DomNodeId, replacement: Element) -> bool {
        for child in &mut self.children {
            if let Node::Element(el) = child {
                if el.id == id {
                    *child = Node::Element(replacement);
                    return true;
                }
                if el.replace_descendant(id, replacement.clone()) {
                    return true;
                }
            }
        }
        false
    }

    /// All elements of the subtree in document (pre-order) order,
    /// including self.
    #[must_use]
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        self.walk(&mut out);
        out
    }

    fn walk<'a>(&'a self, out: &mut Vec<&'a Element>) {
        out.push(self);
        for child in &self.children {
            if let Node::Element(el) = child {
                el.walk(out);
            }
        }
    }

    /// Serialize back to markup. Ids are not serialized; two elements
    /// with the same shape produce the same markup.
    #[must_use]
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        out.push('<');
        out.push_str(&self.tag);
        for attr in &self.attrs {
            if attr.value.is_empty() {
                let _ = write!(out, " {}", attr.name);
            } else {
                let _ = write!(out, " {}=\"{}\"", attr.name, attr.value.replace('"', "&quot;"));
            }
        }
        out.push('>');
        if VOID_ELEMENTS.contains(&self.tag.as_str()) {
            return out;
        }
        for child in &self.children {
            out.push_str(&child.outer_html());
        }
        let _ = write!(out, "</{}>", self.tag);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_set_replaces_in_place() {
        let mut el = Element::new("div");
        el.set_attr("class", "a");
        el.set_attr("id", "x");
        el.set_attr("class", "b");
        assert_eq!(el.attr("class"), Some("b"));
        assert_eq!(el.attributes()[0].name, "class");
        assert_eq!(el.attributes().len(), 2);
    }

    #[test]
    fn script_classification() {
        let plain = Element::new("script").with_attr("src", "/a.js");
        let typed = Element::new("script").with_attr("type", "module");
        let js = Element::new("script").with_attr("type", "text/javascript");
        assert!(plain.is_plain_script());
        assert!(!typed.is_plain_script());
        assert!(js.is_plain_script());
    }

    #[test]
    fn neutralize_and_activate() {
        let mut script = Element::new("script").with_attr("src", "/a.js");
        script.neutralize();
        assert!(script.is_neutralized());
        assert!(!script.is_plain_script());
        script.activate();
        assert!(!script.has_attr("type"));

        let mut import = Element::new("link").with_attr("rel", "import").with_attr("href", "/p.html");
        import.neutralize();
        assert_eq!(import.attr("rel"), Some("none"));
        import.activate();
        assert!(import.is_import_link());
    }

    #[test]
    fn activated_copy_gets_fresh_id() {
        let mut script = Element::new("script").with_attr("src", "/a.js");
        script.neutralize();
        let copy = script.activated_copy();
        assert_ne!(copy.id(), script.id());
        assert!(!copy.has_attr("type"));
        assert_eq!(copy.attr("src"), Some("/a.js"));
    }

    #[test]
    fn child_key_prefers_resource_url() {
        let script = Element::new("script").with_attr("src", "/a.js");
        assert_eq!(script.child_key(), "SCRIPT_/a.js");
        let inline = Element::new("script").with_text("go()");
        assert_eq!(inline.child_key(), "<script>go()</script>");
    }

    #[test]
    fn outer_html_roundtrips_shape() {
        let el = Element::new("div")
            .with_attr("class", "hero")
            .with_child(Element::new("img").with_attr("src", "/x.png"))
            .with_text("hello");
        assert_eq!(
            el.outer_html(),
            "<div class=\"hero\"><img src=\"/x.png\">hello</div>"
        );
    }

    #[test]
    fn find_and_replace_descendant() {
        let inner = Element::new("span").with_text("old");
        let inner_id = inner.id();
        let mut tree = Element::new("div").with_child(Element::new("p").with_child(inner));
        assert!(tree.find(inner_id).is_some());

        let replacement = Element::new("span").with_text("new");
        let new_id = replacement.id();
        assert!(tree.replace_descendant(inner_id, replacement));
        assert!(tree.find(inner_id).is_none());
        assert_eq!(tree.find(new_id).unwrap().text_content(), "new");
    }
}
