//! Readiness waits.
//!
//! Awaitable signals over the host's raw events: "DOM parsed" (latched
//! process-wide), "UI visible" (past prerendering, with the live head's
//! stylesheets settled), and per-resource loads. The stylesheet-set wait
//! is what lets head reconciliation declare completion only once new
//! CSS is actually parsed.

use pageflow_core::dom::ResourceRef;
use pageflow_core::traits::PageHost;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Awaitable readiness signals for one page host.
pub struct Readiness {
    host: Arc<dyn PageHost>,
    dom_seen: AtomicBool,
}

impl Readiness {
    /// Create readiness signals over a host.
    #[must_use]
    pub fn new(host: Arc<dyn PageHost>) -> Self {
        Self {
            host,
            dom_seen: AtomicBool::new(false),
        }
    }

    /// Resolves once the document has been parsed. Latched: after the
    /// first resolution this returns immediately.
    pub async fn dom(&self) {
        if self.dom_seen.load(Ordering::Acquire) {
            return;
        }
        self.host.dom_ready().await;
        self.dom_seen.store(true, Ordering::Release);
        tracing::debug!("dom ready");
    }

    /// Resolves once the page is visible and the live head's
    /// stylesheets have settled.
    pub async fn ui(&self) {
        self.host.ui_visible().await;
        let sheets = {
            let doc = self.host.document();
            let doc = doc.read();
            stylesheet_refs(doc.head())
        };
        self.stylesheets(sheets).await;
        tracing::debug!("ui visible");
    }

    /// Await a set of stylesheet loads in parallel.
    pub async fn stylesheets(&self, targets: Vec<ResourceRef>) {
        if targets.is_empty() {
            return;
        }
        let mut tasks = JoinSet::new();
        for target in targets {
            let host = Arc::clone(&self.host);
            tasks.spawn(async move {
                host.resource_loaded(&target).await;
            });
        }
        while tasks.join_next().await.is_some() {}
    }

    /// Await one node's load/error completion.
    pub async fn node(&self, resource: &ResourceRef) {
        self.host.resource_loaded(resource).await;
    }
}

/// Stylesheet links of a head element, as detached resource refs.
#[must_use]
pub fn stylesheet_refs(head: &pageflow_core::dom::Element) -> Vec<ResourceRef> {
    head.child_elements()
        .into_iter()
        .filter(|el| el.is_stylesheet())
        .map(|el| el.resource_ref())
        .collect()
}
