//! A small, permissive HTML parser.
//!
//! Enough HTML to back the document-builder seam: elements, attributes,
//! text, comments, doctype, void elements, and raw-text handling for
//! `script`/`style`. Entities are kept verbatim; malformed markup is
//! recovered from rather than rejected (stray close tags are dropped,
//! unclosed elements auto-close at end of input).

use super::document::Document;
use super::node::{Element, Node};
use crate::error::{PageError, PageResult};

/// Parse HTML text into a document.
///
/// # Errors
///
/// Returns [`PageError::DocumentParse`] only for input that yields no
/// markup at all (empty or whitespace-only text).
pub fn parse(html: &str) -> PageResult<Document> {
    if html.trim().is_empty() {
        return Err(PageError::DocumentParse {
            url: String::new(),
            cause: "empty document text".to_string(),
        });
    }
    let nodes = Parser::new(html).parse_nodes();
    let mut root: Option<Element> = None;
    let mut rest: Vec<Node> = Vec::new();
    for node in nodes {
        match node {
            Node::Element(el) if el.tag() == "html" && root.is_none() => root = Some(el),
            other => rest.push(other),
        }
    }

    Ok(match root {
        Some(root) => Document::from_root(root),
        None => {
            // No <html> shell: treat the input as a body fragment
            let mut body = Element::new("body");
            for node in rest {
                body.push_child(node);
            }
            let shell = Element::new("html").with_child(body);
            Document::from_root(shell)
        }
    })
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn parse_nodes(&mut self) -> Vec<Node> {
        let mut stack: Vec<Element> = Vec::new();
        let mut top: Vec<Node> = Vec::new();

        while let Some(token) = self.next_token() {
            match token {
                Token::Text(text) => {
                    Self::append(&mut stack, &mut top, Node::Text(text));
                }
                Token::Comment(text) => {
                    Self::append(&mut stack, &mut top, Node::Comment(text));
                }
                Token::Open { element, closed } => {
                    if closed {
                        Self::append(&mut stack, &mut top, Node::Element(element));
                    } else if element.tag() == "script" || element.tag() == "style" {
                        // Raw text element: consume up to the close tag
                        let mut el = element;
                        let text = self.raw_text(el.tag());
                        if !text.is_empty() {
                            el.push_child(Node::Text(text));
                        }
                        Self::append(&mut stack, &mut top, Node::Element(el));
                    } else {
                        stack.push(element);
                    }
                }
                Token::Close(tag) => {
                    if let Some(depth) = stack.iter().rposition(|el| el.tag() == tag) {
                        // Auto-close anything the close tag skipped over
                        while stack.len() > depth {
                            if let Some(done) = stack.pop() {
                                Self::append(&mut stack, &mut top, Node::Element(done));
                            }
                        }
                    }
                    // A close tag with no matching open is dropped
                }
            }
        }
        while let Some(done) = stack.pop() {
            Self::append(&mut stack, &mut top, Node::Element(done));
        }
        top
    }

    fn append(stack: &mut [Element], top: &mut Vec<Node>, node: Node) {
        // Whitespace-only text between elements is layout noise
        if let Node::Text(text) = &node {
            if text.trim().is_empty() {
                return;
            }
        }
        match stack.last_mut() {
            Some(parent) => parent.push_child(node),
            None => top.push(node),
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        if self.pos >= self.input.len() {
            return None;
        }
        if self.input[self.pos] != b'<' {
            let start = self.pos;
            while self.pos < self.input.len() && self.input[self.pos] != b'<' {
                self.pos += 1;
            }
            return Some(Token::Text(self.slice(start, self.pos)));
        }
        if self.starts_with("<!--") {
            self.pos += 4;
            let start = self.pos;
            let end = self.find("-->").unwrap_or(self.input.len());
            self.pos = (end + 3).min(self.input.len());
            return Some(Token::Comment(self.slice(start, end)));
        }
        if self.starts_with("<!") {
            // Doctype or other declaration: skip to '>'
            while self.pos < self.input.len() && self.input[self.pos] != b'>' {
                self.pos += 1;
            }
            self.pos = (self.pos + 1).min(self.input.len());
            return self.next_token();
        }
        if self.starts_with("</") {
            self.pos += 2;
            let tag = self.read_name();
            while self.pos < self.input.len() && self.input[self.pos] != b'>' {
                self.pos += 1;
            }
            self.pos = (self.pos + 1).min(self.input.len());
            return Some(Token::Close(tag));
        }
        // Open tag
        self.pos += 1;
        let tag = self.read_name();
        if tag.is_empty() {
            // A lone '<' in text
            return Some(Token::Text("<".to_string()));
        }
        let mut element = Element::new(tag);
        loop {
            self.skip_whitespace();
            if self.pos >= self.input.len() {
                return Some(Token::Open {
                    element,
                    closed: true,
                });
            }
            match self.input[self.pos] {
                b'>' => {
                    self.pos += 1;
                    let closed = is_void(element.tag());
                    return Some(Token::Open { element, closed });
                }
                b'/' => {
                    self.pos += 1;
                    if self.pos < self.input.len() && self.input[self.pos] == b'>' {
                        self.pos += 1;
                    }
                    return Some(Token::Open {
                        element,
                        closed: true,
                    });
                }
                _ => {
                    let name = self.read_name();
                    if name.is_empty() {
                        self.pos += 1;
                        continue;
                    }
                    self.skip_whitespace();
                    let value = if self.pos < self.input.len() && self.input[self.pos] == b'='
                    {
                        self.pos += 1;
                        self.skip_whitespace();
                        self.read_attr_value()
                    } else {
                        String::new()
                    };
                    element.set_attr(name, value);
                }
            }
        }
    }

    fn raw_text(&mut self, tag: &str) -> String {
        let close = format!("</{}", tag);
        let start = self.pos;
        let end = self.find_ci(&close).unwrap_or(self.input.len());
        self.pos = end;
        // Consume the close tag itself
        if self.pos < self.input.len() {
            while self.pos < self.input.len() && self.input[self.pos] != b'>' {
                self.pos += 1;
            }
            self.pos = (self.pos + 1).min(self.input.len());
        }
        self.slice(start, end)
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.input.len() {
            match self.input[self.pos] {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b':' => self.pos += 1,
                _ => break,
            }
        }
        self.slice(start, self.pos).to_ascii_lowercase()
    }

    fn read_attr_value(&mut self) -> String {
        if self.pos >= self.input.len() {
            return String::new();
        }
        match self.input[self.pos] {
            quote @ (b'"' | b'\'') => {
                self.pos += 1;
                let start = self.pos;
                while self.pos < self.input.len() && self.input[self.pos] != quote {
                    self.pos += 1;
                }
                let value = self.slice(start, self.pos);
                self.pos = (self.pos + 1).min(self.input.len());
                value
            }
            _ => {
                let start = self.pos;
                while self.pos < self.input.len()
                    && !self.input[self.pos].is_ascii_whitespace()
                    && self.input[self.pos] != b'>'
                    && self.input[self.pos] != b'/'
                {
                    self.pos += 1;
                }
                self.slice(start, self.pos)
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.input[self.pos..].starts_with(prefix.as_bytes())
    }

    fn find(&self, needle: &str) -> Option<usize> {
        self.input[self.pos..]
            .windows(needle.len())
            .position(|w| w == needle.as_bytes())
            .map(|i| i + self.pos)
    }

    fn find_ci(&self, needle: &str) -> Option<usize> {
        let needle = needle.as_bytes();
        self.input[self.pos..]
            .windows(needle.len())
            .position(|w| w.eq_ignore_ascii_case(needle))
            .map(|i| i + self.pos)
    }

    fn slice(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.input[start..end]).into_owned()
    }
}

enum Token {
    Text(String),
    Comment(String),
    Open { element: Element, closed: bool },
    Close(String),
}

fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_document() {
        let doc = parse(
            r#"<!DOCTYPE html>
            <html lang="en">
            <head>
                <title>Home</title>
                <link rel="stylesheet" href="/app.css">
                <script src="/app.js"></script>
            </head>
            <body class="page">
                <h1>Hello</h1>
                <script>boot()</script>
            </body>
            </html>"#,
        )
        .unwrap();

        assert_eq!(doc.root().attr("lang"), Some("en"));
        let head = doc.head();
        assert_eq!(head.child_elements().len(), 3);
        assert_eq!(head.child_elements()[0].text_content(), "Home");
        assert!(head.child_elements()[1].is_stylesheet());
        assert_eq!(doc.body().attr("class"), Some("page"));
        let scripts = doc.deferrable_nodes();
        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[1].text_content(), "boot()");
    }

    #[test]
    fn fragment_becomes_body_content() {
        let doc = parse("<p>one</p><p>two</p>").unwrap();
        assert_eq!(doc.body().child_elements().len(), 2);
        assert!(doc.head().children().is_empty());
    }

    #[test]
    fn script_content_is_raw() {
        let doc = parse("<html><body><script>if (a < b) go()</script></body></html>").unwrap();
        let script = &doc.body().child_elements()[0];
        assert_eq!(script.text_content(), "if (a < b) go()");
    }

    #[test]
    fn void_and_self_closing_elements() {
        let doc = parse("<html><head><meta charset=\"utf-8\"><br/></head><body></body></html>")
            .unwrap();
        assert_eq!(doc.head().child_elements().len(), 2);
    }

    #[test]
    fn unquoted_and_bare_attributes() {
        let doc = parse("<html><body><input type=text disabled></body></html>").unwrap();
        let input = &doc.body().child_elements()[0];
        assert_eq!(input.attr("type"), Some("text"));
        assert_eq!(input.attr("disabled"), Some(""));
    }

    #[test]
    fn stray_close_tags_are_dropped() {
        let doc = parse("<html><body></span><p>ok</p></body></html>").unwrap();
        assert_eq!(doc.body().child_elements().len(), 1);
    }

    #[test]
    fn unclosed_elements_autoclose() {
        let doc = parse("<html><body><div><p>text").unwrap();
        let div = &doc.body().child_elements()[0];
        assert_eq!(div.tag(), "div");
        assert_eq!(div.text_content(), "text");
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = parse("   ").unwrap_err();
        assert_eq!(err.code(), "E204");
    }

    #[test]
    fn comments_preserved() {
        let doc = parse("<html><body><!-- note --><p>x</p></body></html>").unwrap();
        assert!(matches!(doc.body().children()[0], Node::Comment(_)));
    }
}
