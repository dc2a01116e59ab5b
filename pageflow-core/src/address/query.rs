//! Query string codec.
//!
//! Queries are ordered multimaps: a key may appear several times and
//! insertion order is preserved by `format`. Equivalence between two
//! queries ignores pair order (`normalized`), so `?a=1&b=2` and
//! `?b=2&a=1` compare equal.

use url::form_urlencoded;

/// A parsed query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    /// Parse a query string (without the leading `?`).
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let pairs = form_urlencoded::parse(input.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    /// Format back into a query string, preserving pair order.
    #[must_use]
    pub fn format(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.pairs {
            serializer.append_pair(k, v);
        }
        serializer.finish()
    }

    /// Format with pairs sorted, the canonical form used for equality.
    #[must_use]
    pub fn normalized(&self) -> String {
        let mut pairs = self.pairs.clone();
        pairs.sort();
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &pairs {
            serializer.append_pair(k, v);
        }
        serializer.finish()
    }

    /// Whether the query has no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// First value for a key.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for a key, in order.
    #[must_use]
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Append a pair.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Iterate over pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_format_roundtrip() {
        let q = Query::parse("a=1&b=two&a=3");
        assert_eq!(q.len(), 3);
        assert_eq!(q.first("a"), Some("1"));
        assert_eq!(q.all("a"), vec!["1", "3"]);
        assert_eq!(q.format(), "a=1&b=two&a=3");
    }

    #[test]
    fn normalized_ignores_order() {
        let a = Query::parse("b=2&a=1");
        let b = Query::parse("a=1&b=2");
        assert_ne!(a.format(), b.format());
        assert_eq!(a.normalized(), b.normalized());
    }

    #[test]
    fn encoding_survives() {
        let q = Query::parse("q=a%20b&name=caf%C3%A9");
        assert_eq!(q.first("q"), Some("a b"));
        assert_eq!(q.first("name"), Some("café"));
        let again = Query::parse(&q.format());
        assert_eq!(q, again);
    }

    #[test]
    fn empty_query() {
        let q = Query::parse("");
        assert!(q.is_empty());
        assert_eq!(q.format(), "");
    }

    #[test]
    fn valueless_key() {
        let q = Query::parse("flag");
        assert_eq!(q.first("flag"), Some(""));
    }
}
