//! Core trait seams.
//!
//! The engine reaches the outside world only through these traits: the
//! page host (document, visibility, history), the fetcher, and the
//! document builder. Production code plugs in real implementations;
//! tests use the doubles from [`crate::testing`].

mod fetch;
mod host;

pub use fetch::{
    DocumentBuilder, FetchFuture, FetchResponse, Fetcher, HtmlDocumentBuilder, HyperFetcher,
};
pub use host::{HostFuture, PageHost, Visibility};
