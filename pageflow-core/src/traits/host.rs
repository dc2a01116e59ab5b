//! The page host capability.

use crate::dom::{ResourceRef, SharedDocument};
use crate::error::PageResult;
use crate::types::HistoryEntry;
use std::future::Future;
use std::pin::Pin;
use url::Url;

/// Type alias for boxed host futures.
pub type HostFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Document visibility, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// The page is visible to the user.
    Visible,
    /// The page is loaded but not shown (background tab).
    Hidden,
    /// The page is being rendered ahead of being shown.
    Prerender,
}

/// The minimal surface the engine needs from its hosting page.
///
/// In a browser this would wrap `document`, `window.location`,
/// `window.history` and the visibility API. The engine never assumes
/// more than this trait, which is what makes the whole lifecycle
/// testable against [`crate::testing::MemoryHost`].
///
/// # Implementation Notes
///
/// - `dom_ready` must resolve immediately once the document has been
///   parsed; callers may await it any number of times.
/// - `ui_visible` resolves once the page is past prerendering.
/// - `resource_loaded` resolves when the given node's resource has
///   either loaded or failed; failures are not distinguished, matching
///   load/error listeners that only gate progress.
pub trait PageHost: Send + Sync {
    /// The document's current location.
    fn location(&self) -> Url;

    /// The document referrer, if any.
    fn document_referrer(&self) -> Option<String>;

    /// The live document.
    fn document(&self) -> SharedDocument;

    /// The document title, used when persisting history entries.
    fn title(&self) -> String;

    /// Current visibility state.
    fn visibility(&self) -> Visibility;

    /// Resolves when the document has been parsed.
    fn dom_ready(&self) -> HostFuture<'_, ()>;

    /// Resolves when the page is visible (not prerendering).
    fn ui_visible(&self) -> HostFuture<'_, ()>;

    /// Resolves when the node's resource has loaded or failed.
    fn resource_loaded(&self, resource: &ResourceRef) -> HostFuture<'_, ()>;

    /// The payload of the current history entry, if one was persisted.
    fn history_state(&self) -> Option<HistoryEntry>;

    /// Push a new history entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PageError::HistoryPayload`] when the entry
    /// cannot be persisted.
    fn history_push(&self, entry: &HistoryEntry, title: &str) -> PageResult<()>;

    /// Replace the current history entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PageError::HistoryPayload`] when the entry
    /// cannot be persisted.
    fn history_replace(&self, entry: &HistoryEntry, title: &str) -> PageResult<()>;

    /// Leave the in-page flow and perform a real navigation.
    fn assign_location(&self, url: &str);
}
