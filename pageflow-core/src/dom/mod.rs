//! Lightweight document tree.
//!
//! The engine never touches a real browser DOM; it works against this
//! model through the page host. Nodes carry stable ids so the
//! reconciler can locate a node again after it has been merged into the
//! live document.

mod document;
mod node;
mod parser;

pub use document::{shared, Document, SharedDocument};
pub use node::{Attribute, Element, Node, ResourceRef};
pub use parser::parse;
