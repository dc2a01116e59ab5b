//! Prelude for convenient imports.
//!
//! This module re-exports the most commonly used types and traits.
//!
//! # Example
//!
//! ```ignore
//! use pageflow_core::prelude::*;
//! ```

// Core types
pub use crate::types::{ChannelId, DomNodeId, HistoryEntry, ListenerId, Stage, StateId, STAGES};

// Error handling
pub use crate::error::{PageError, PageResult};

// Addresses
pub use crate::address::{self, Address, Origin, Query};

// Document model
pub use crate::dom::{Attribute, Document, Element, Node, ResourceRef, SharedDocument};

// Diffing
pub use crate::diff::{list_diff, ListPatch};

// Traits
pub use crate::traits::{
    DocumentBuilder, FetchResponse, Fetcher, HostFuture, HtmlDocumentBuilder, HyperFetcher,
    PageHost, Visibility,
};
