//! Navigation address parsing, formatting and comparison.
//!
//! An [`Address`] is the location part of a navigation state: pathname,
//! query, hash, and, only for cross-origin targets, an explicit
//! origin. Same-origin addresses stay relative so formatting them yields
//! stable, origin-independent hrefs.
//!
//! All parsing resolves against a base URL (the host document's
//! location), mirroring how a browser resolves relative hrefs.

mod query;

pub use query::Query;

use crate::error::{PageError, PageResult};
use url::Url;

/// Explicit origin components, present only on cross-origin addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// URL scheme without the trailing colon (e.g. `https`).
    pub protocol: String,
    /// Host name.
    pub hostname: String,
    /// Port, absent when it is the scheme's default.
    pub port: Option<u16>,
}

/// A parsed navigation address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    /// Path component, always starting with `/` for parsed addresses.
    pub pathname: String,
    /// Parsed query string.
    pub query: Query,
    /// Fragment without the leading `#`, absent when empty.
    pub hash: Option<String>,
    /// Explicit origin for cross-origin addresses, `None` when the
    /// address shares the base document's origin.
    pub origin: Option<Origin>,
}

impl Address {
    /// An address with no components at all.
    ///
    /// Used for detached referrers (first load, forced reload): its
    /// pathname compares unequal to every parsed pathname, which forces
    /// a full route.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this address has any location components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pathname.is_empty() && self.query.is_empty() && self.hash.is_none()
    }
}

/// Parse an address, resolving it against `base`.
///
/// An empty input parses to the base location itself, including its
/// hash. Same-origin results carry no explicit origin.
///
/// # Errors
///
/// Returns [`PageError::AddressParse`] when the input is not a valid
/// relative or absolute URL.
pub fn parse(input: &str, base: &Url) -> PageResult<Address> {
    let url = if input.is_empty() {
        base.clone()
    } else {
        Url::options()
            .base_url(Some(base))
            .parse(input)
            .map_err(|e| PageError::AddressParse {
                input: input.to_string(),
                cause: e.to_string(),
            })?
    };

    let mut pathname = url.path().to_string();
    if pathname.is_empty() {
        pathname = "/".to_string();
    } else if !pathname.starts_with('/') {
        pathname.insert(0, '/');
    }

    let hash = url.fragment().filter(|f| !f.is_empty()).map(str::to_string);

    let origin = if same_url_origin(&url, base) {
        None
    } else {
        Some(Origin {
            protocol: url.scheme().to_string(),
            hostname: url.host_str().unwrap_or_default().to_string(),
            // Url::port() already elides scheme-default ports
            port: url.port(),
        })
    };

    Ok(Address {
        pathname,
        query: Query::parse(url.query().unwrap_or_default()),
        hash,
        origin,
    })
}

/// Format an address back into an href.
///
/// Same-origin addresses format relative (`/path?query#hash`);
/// cross-origin addresses are absolute. The formatted form of a parsed
/// address parses back to an equivalent address.
#[must_use]
pub fn format(addr: &Address, base: &Url) -> String {
    let mut out = String::new();
    if let Some(origin) = &addr.origin {
        out.push_str(&origin.protocol);
        out.push_str("://");
        out.push_str(&origin.hostname);
        if let Some(port) = origin.port {
            out.push(':');
            out.push_str(&port.to_string());
        }
    }
    if addr.pathname.is_empty() {
        out.push_str(base.path());
    } else {
        out.push_str(&addr.pathname);
    }
    let qs = addr.query.format();
    if !qs.is_empty() {
        out.push('?');
        out.push_str(&qs);
    }
    if let Some(hash) = &addr.hash {
        out.push('#');
        out.push_str(hash);
    }
    out
}

/// Whether two addresses share an origin, defaulting absent origins to
/// the base document's.
#[must_use]
pub fn same_origin(a: &Address, b: &Address, base: &Url) -> bool {
    effective_origin(a, base) == effective_origin(b, base)
}

/// Whether two addresses share origin and pathname.
#[must_use]
pub fn same_pathname(a: &Address, b: &Address, base: &Url) -> bool {
    same_origin(a, b, base) && a.pathname == b.pathname
}

/// Whether two addresses carry an equivalent query, ignoring pair order.
#[must_use]
pub fn same_query(a: &Address, b: &Address) -> bool {
    a.query.normalized() == b.query.normalized()
}

/// Whether two addresses share origin, pathname and normalized query.
#[must_use]
pub fn same_path(a: &Address, b: &Address, base: &Url) -> bool {
    same_pathname(a, b, base) && same_query(a, b)
}

fn same_url_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

fn effective_origin(addr: &Address, base: &Url) -> (String, String, Option<u16>) {
    match &addr.origin {
        Some(origin) => (
            origin.protocol.clone(),
            origin.hostname.clone(),
            origin.port.or_else(|| default_port(&origin.protocol)),
        ),
        None => (
            base.scheme().to_string(),
            base.host_str().unwrap_or_default().to_string(),
            base.port_or_known_default(),
        ),
    }
}

fn default_port(protocol: &str) -> Option<u16> {
    match protocol {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        _ => None,
    }
}
