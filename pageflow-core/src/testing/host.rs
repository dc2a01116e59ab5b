//! In-memory page host.

use crate::dom::{shared, Document, ResourceRef, SharedDocument};
use crate::error::PageResult;
use crate::traits::{HostFuture, PageHost, Visibility};
use crate::types::HistoryEntry;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use url::Url;

/// A manually releasable readiness gate.
struct Gate {
    open: Mutex<bool>,
    notify: Notify,
}

impl Gate {
    fn new(open: bool) -> Self {
        Self {
            open: Mutex::new(open),
            notify: Notify::new(),
        }
    }

    async fn wait(&self) {
        loop {
            // Register interest before checking, so an open between the
            // check and the await cannot be missed.
            let notified = self.notify.notified();
            if *self.open.lock() {
                return;
            }
            notified.await;
        }
    }

    fn open(&self) {
        *self.open.lock() = true;
        self.notify.notify_waiters();
    }

    fn close(&self) {
        *self.open.lock() = false;
    }
}

struct HostInner {
    location: RwLock<Url>,
    referrer: RwLock<Option<String>>,
    document: SharedDocument,
    title: RwLock<String>,
    visibility: RwLock<Visibility>,
    visibility_notify: Notify,
    dom_gate: Gate,
    resource_gates: Mutex<HashMap<String, Arc<Gate>>>,
    loads: Mutex<Vec<ResourceRef>>,
    stack: Mutex<Vec<HistoryEntry>>,
    history_log: Mutex<Vec<(&'static str, HistoryEntry)>>,
    assigned: Mutex<Vec<String>>,
}

/// An in-memory [`PageHost`] with manual control over every signal the
/// engine can wait on.
///
/// Readiness gates default to open: a test that does not care about
/// timing never blocks. Holding a gate (`hold_resource`) lets a test
/// decide resolution order; completed resource waits are recorded in
/// completion order.
#[derive(Clone)]
pub struct MemoryHost {
    inner: Arc<HostInner>,
}

impl MemoryHost {
    /// Create a host at the given location with an empty document.
    ///
    /// # Panics
    ///
    /// Panics when `location` is not an absolute URL.
    #[must_use]
    pub fn new(location: &str) -> Self {
        let location = Url::parse(location).expect("host location must be an absolute URL");
        Self {
            inner: Arc::new(HostInner {
                location: RwLock::new(location),
                referrer: RwLock::new(None),
                document: shared(Document::new()),
                title: RwLock::new(String::new()),
                visibility: RwLock::new(Visibility::Visible),
                visibility_notify: Notify::new(),
                dom_gate: Gate::new(true),
                resource_gates: Mutex::new(HashMap::new()),
                loads: Mutex::new(Vec::new()),
                stack: Mutex::new(Vec::new()),
                history_log: Mutex::new(Vec::new()),
                assigned: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Replace the live document.
    pub fn set_document(&self, doc: Document) {
        *self.inner.document.write() = doc;
    }

    /// Set the document referrer.
    pub fn set_referrer(&self, referrer: impl Into<String>) {
        *self.inner.referrer.write() = Some(referrer.into());
    }

    /// Change the location (as a real navigation would).
    ///
    /// # Panics
    ///
    /// Panics when `location` is not an absolute URL.
    pub fn set_location(&self, location: &str) {
        *self.inner.location.write() =
            Url::parse(location).expect("host location must be an absolute URL");
    }

    /// Set the document title.
    pub fn set_title(&self, title: impl Into<String>) {
        *self.inner.title.write() = title.into();
    }

    /// Change visibility and wake `ui_visible` waiters.
    pub fn set_visibility(&self, visibility: Visibility) {
        *self.inner.visibility.write() = visibility;
        self.inner.visibility_notify.notify_waiters();
    }

    /// Make `dom_ready` block until [`Self::finish_dom`] is called.
    pub fn hold_dom(&self) {
        self.inner.dom_gate.close();
    }

    /// Release `dom_ready` waiters.
    pub fn finish_dom(&self) {
        self.inner.dom_gate.open();
    }

    /// Make `resource_loaded` for this URL block until released.
    pub fn hold_resource(&self, url: &str) {
        self.inner
            .resource_gates
            .lock()
            .insert(url.to_string(), Arc::new(Gate::new(false)));
    }

    /// Release a held resource.
    pub fn release_resource(&self, url: &str) {
        if let Some(gate) = self.inner.resource_gates.lock().get(url) {
            gate.open();
        }
    }

    /// Resource waits that completed, in completion order.
    #[must_use]
    pub fn loaded_resources(&self) -> Vec<ResourceRef> {
        self.inner.loads.lock().clone()
    }

    /// Every history operation in order, as `("push" | "replace", entry)`.
    #[must_use]
    pub fn history_log(&self) -> Vec<(&'static str, HistoryEntry)> {
        self.inner.history_log.lock().clone()
    }

    /// The top of the history stack.
    #[must_use]
    pub fn history_top(&self) -> Option<HistoryEntry> {
        self.inner.stack.lock().last().cloned()
    }

    /// Locations handed to `assign_location` (real navigations).
    #[must_use]
    pub fn assigned_locations(&self) -> Vec<String> {
        self.inner.assigned.lock().clone()
    }
}

impl PageHost for MemoryHost {
    fn location(&self) -> Url {
        self.inner.location.read().clone()
    }

    fn document_referrer(&self) -> Option<String> {
        self.inner.referrer.read().clone()
    }

    fn document(&self) -> SharedDocument {
        Arc::clone(&self.inner.document)
    }

    fn title(&self) -> String {
        self.inner.title.read().clone()
    }

    fn visibility(&self) -> Visibility {
        *self.inner.visibility.read()
    }

    fn dom_ready(&self) -> HostFuture<'_, ()> {
        Box::pin(self.inner.dom_gate.wait())
    }

    fn ui_visible(&self) -> HostFuture<'_, ()> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            loop {
                let notified = inner.visibility_notify.notified();
                if *inner.visibility.read() != Visibility::Prerender {
                    return;
                }
                notified.await;
            }
        })
    }

    fn resource_loaded(&self, resource: &ResourceRef) -> HostFuture<'_, ()> {
        let inner = Arc::clone(&self.inner);
        let resource = resource.clone();
        Box::pin(async move {
            if let Some(url) = &resource.url {
                let gate = inner.resource_gates.lock().get(url).cloned();
                if let Some(gate) = gate {
                    gate.wait().await;
                }
            }
            inner.loads.lock().push(resource);
        })
    }

    fn history_state(&self) -> Option<HistoryEntry> {
        self.history_top()
    }

    fn history_push(&self, entry: &HistoryEntry, _title: &str) -> PageResult<()> {
        self.inner.stack.lock().push(entry.clone());
        self.inner.history_log.lock().push(("push", entry.clone()));
        Ok(())
    }

    fn history_replace(&self, entry: &HistoryEntry, _title: &str) -> PageResult<()> {
        let mut stack = self.inner.stack.lock();
        stack.pop();
        stack.push(entry.clone());
        self.inner
            .history_log
            .lock()
            .push(("replace", entry.clone()));
        Ok(())
    }

    fn assign_location(&self, url: &str) {
        self.inner.assigned.lock().push(url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;

    #[tokio::test]
    async fn gates_default_open() {
        let host = MemoryHost::new("https://example.com/");
        host.dom_ready().await;
        host.ui_visible().await;
        let node = Element::new("script").with_attr("src", "/a.js");
        host.resource_loaded(&node.resource_ref()).await;
        assert_eq!(host.loaded_resources().len(), 1);
    }

    #[tokio::test]
    async fn held_resource_blocks_until_release() {
        let host = MemoryHost::new("https://example.com/");
        host.hold_resource("/slow.js");

        let node = Element::new("script").with_attr("src", "/slow.js");
        let waiter = {
            let host = host.clone();
            let resource = node.resource_ref();
            tokio::spawn(async move { host.resource_loaded(&resource).await })
        };
        tokio::task::yield_now().await;
        assert!(host.loaded_resources().is_empty());

        host.release_resource("/slow.js");
        waiter.await.unwrap();
        assert_eq!(host.loaded_resources().len(), 1);
    }

    #[tokio::test]
    async fn ui_visible_waits_out_prerender() {
        let host = MemoryHost::new("https://example.com/");
        host.set_visibility(Visibility::Prerender);

        let waiter = {
            let host = host.clone();
            tokio::spawn(async move { host.ui_visible().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        host.set_visibility(Visibility::Visible);
        waiter.await.unwrap();
    }

    #[test]
    fn history_stack_semantics() {
        let host = MemoryHost::new("https://example.com/");
        host.history_push(&HistoryEntry::new("/a"), "").unwrap();
        host.history_push(&HistoryEntry::new("/b"), "").unwrap();
        host.history_replace(&HistoryEntry::new("/b2"), "").unwrap();
        assert_eq!(host.history_top().unwrap().href, "/b2");
        assert_eq!(host.history_log().len(), 3);
    }
}
