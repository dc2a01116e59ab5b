//! Test doubles for the host and fetcher seams.
//!
//! `MemoryHost` is a full in-memory page host: a live document, manual
//! readiness gates, a history stack, and recorded side effects.
//! `MockFetch` answers fetches from rules and records every request.
//!
//! # Example
//!
//! ```ignore
//! use pageflow_core::testing::{MemoryHost, MockFetch};
//!
//! let host = MemoryHost::new("https://example.com/");
//! host.set_visibility(pageflow_core::traits::Visibility::Prerender);
//!
//! let fetch = MockFetch::new()
//!     .on(r"^/next$")
//!     .respond_html(200, "<html><body><h1>Next</h1></body></html>");
//! ```

mod fetch;
mod host;

pub use fetch::{FetchRequest, MockFetch, MockFetchBuilder, MockFetchRule};
pub use host::MemoryHost;

use crate::dom::Document;

/// Parse HTML into a document, panicking on failure.
///
/// Test convenience only.
#[must_use]
pub fn html_doc(html: &str) -> Document {
    crate::dom::parse(html).expect("test document must parse")
}
