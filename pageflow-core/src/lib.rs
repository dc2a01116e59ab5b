//! Pageflow core library.
//!
//! This crate provides the foundational types, traits, and leaf services
//! for the pageflow page-transition engine.
//!
//! # Overview
//!
//! Pageflow drives client-side page transitions for single-document web
//! applications: it intercepts navigation, fetches the next document,
//! merges it into the live page, and runs application code through a
//! fixed sequence of lifecycle stages.
//!
//! # Key Components
//!
//! - **Address**: parse/format navigation addresses and compare their
//!   origin, pathname and query components
//! - **Dom**: a lightweight document tree with stable node ids, used by
//!   the reconciler and the test host
//! - **Diff**: minimal-edit list diffing, the primitive behind head
//!   attribute and child reconciliation
//! - **Traits**: the `PageHost`, `Fetcher` and `DocumentBuilder` seams
//!   that keep the engine independent of any real browser host
//!
//! # Example
//!
//! ```ignore
//! use pageflow_core::prelude::*;
//!
//! let base = url::Url::parse("https://example.com/index.html")?;
//! let addr = address::parse("/articles?page=2", &base)?;
//! assert_eq!(addr.pathname, "/articles");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod diff;
pub mod dom;
pub mod error;
pub mod prelude;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export key types at crate root for convenience
pub use error::{PageError, PageResult};
pub use types::{ChannelId, DomNodeId, HistoryEntry, ListenerId, Stage, StateId, STAGES};
