//! Document reconciliation.
//!
//! Merges an incoming document into the live one while keeping
//! already-initialized subtrees alive and executing scripts in document
//! order exactly once:
//!
//! 1. Resources already present in the live page (by URL) are marked
//!    known and never refetched; every other external resource gets a
//!    bounded-timeout concurrent preload.
//! 2. Script and import nodes in the incoming document are neutralized
//!    (`type`/`rel` rewritten to inert values) before any DOM work, so
//!    merging cannot execute them early.
//! 3. Root attributes are copied over; the head is patched with a
//!    minimal attribute and child diff; the body is swapped wholesale.
//! 4. Neutralized nodes are replayed serially in original document
//!    order: each new node is replaced by an activated copy and its
//!    load awaited before the next starts, so execution order matches
//!    document order regardless of fetch completion order.

use crate::wait::Readiness;
use pageflow_core::diff::{list_diff, ListPatch};
use pageflow_core::dom::{Attribute, Document, Element, Node, ResourceRef};
use pageflow_core::traits::{Fetcher, PageHost};
use pageflow_core::{DomNodeId, PageResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// One replayed script/import node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayedNode {
    /// The node's id in the live document after replay.
    pub node: DomNodeId,
    /// The node's tag.
    pub tag: String,
    /// The node's resource URL, `None` for inline scripts.
    pub url: Option<String>,
    /// Whether the resource was already loaded by the previous page
    /// (activated in place, not re-executed from the network).
    pub reused: bool,
}

/// Structured account of one merge.
#[derive(Debug, Default)]
pub struct MergeReport {
    /// Attribute changes applied to the root element.
    pub root_attr_patches: usize,
    /// Attribute patches applied to the head.
    pub head_attr_patches: usize,
    /// Child patches applied to the head.
    pub head_child_patches: usize,
    /// Whether the body was swapped (always, once a merge runs).
    pub body_replaced: bool,
    /// URLs successfully preloaded.
    pub preloaded: Vec<String>,
    /// URLs whose preload failed; the node still loads natively.
    pub preload_failures: Vec<String>,
    /// Stylesheets awaited as part of head-merge completion.
    pub stylesheets_awaited: Vec<String>,
    /// Script/import nodes replayed, in execution order.
    pub executed: Vec<ReplayedNode>,
}

impl MergeReport {
    /// Total head patch operations (attributes plus children).
    #[must_use]
    pub fn head_patches(&self) -> usize {
        self.head_attr_patches + self.head_child_patches
    }
}

/// Merges incoming documents into the host's live document.
pub struct Reconciler {
    host: Arc<dyn PageHost>,
    fetcher: Arc<dyn Fetcher>,
    readiness: Arc<Readiness>,
    preload_timeout_ms: u64,
}

impl Reconciler {
    /// Create a reconciler.
    #[must_use]
    pub fn new(
        host: Arc<dyn PageHost>,
        fetcher: Arc<dyn Fetcher>,
        readiness: Arc<Readiness>,
        preload_timeout_ms: u64,
    ) -> Self {
        Self {
            host,
            fetcher,
            readiness,
            preload_timeout_ms,
        }
    }

    /// Merge an incoming document into the live one.
    ///
    /// # Errors
    ///
    /// Currently infallible in practice (preload failures are logged,
    /// not fatal) but kept fallible as the seam where a host could
    /// refuse a merge.
    pub async fn merge(&self, mut incoming: Document) -> PageResult<MergeReport> {
        let mut report = MergeReport::default();
        let shared = self.host.document();

        // Resources the live page already loaded, by URL
        let known: HashSet<String> = {
            let live = shared.read();
            live.deferrable_nodes()
                .into_iter()
                .filter_map(|el| el.resource_url().map(str::to_string))
                .collect()
        };

        // Neutralize incoming script/import nodes, keeping their order
        let mut serials: Vec<ResourceRef> = Vec::new();
        neutralize_deferrable(incoming.root_mut(), &mut serials);
        tracing::debug!(nodes = serials.len(), known = known.len(), "import new document");

        // Preload everything unknown and external, concurrently
        let mut preloads: HashMap<String, JoinHandle<bool>> = HashMap::new();
        for serial in &serials {
            let Some(url) = &serial.url else { continue };
            if known.contains(url) || url.starts_with("data:") || preloads.contains_key(url) {
                continue;
            }
            let fetcher = Arc::clone(&self.fetcher);
            let timeout_ms = self.preload_timeout_ms;
            let target = url.clone();
            preloads.insert(
                url.clone(),
                tokio::spawn(async move {
                    match fetcher.get(&target, timeout_ms).await {
                        Ok(_) => {
                            tracing::debug!(url = %target, "preloaded");
                            true
                        }
                        Err(err) => {
                            tracing::debug!(url = %target, error = %err, "not preloaded");
                            false
                        }
                    }
                }),
            );
        }

        // Stylesheets the head merge introduces must have their CSS
        // parsed before the merge counts as complete
        let sheet_targets: Vec<ResourceRef> = {
            let live = shared.read();
            let live_hrefs: HashSet<String> = live
                .head()
                .child_elements()
                .into_iter()
                .filter(|el| el.is_stylesheet())
                .filter_map(|el| el.attr("href").map(str::to_string))
                .collect();
            incoming
                .head()
                .child_elements()
                .into_iter()
                .filter(|el| el.is_stylesheet())
                .filter(|el| {
                    el.attr("href")
                        .is_some_and(|href| !live_hrefs.contains(href))
                })
                .map(Element::resource_ref)
                .collect()
        };

        {
            let mut live = shared.write();
            report.root_attr_patches = merge_root_attributes(live.root_mut(), incoming.root());
            report.head_attr_patches = merge_attributes(live.head_mut(), incoming.head());
            report.head_child_patches = merge_children(live.head_mut(), incoming.head());
        }

        report.stylesheets_awaited = sheet_targets
            .iter()
            .filter_map(|r| r.url.clone())
            .collect();
        self.readiness.stylesheets(sheet_targets).await;

        {
            let mut live = shared.write();
            live.set_body(incoming.body().clone());
            report.body_replaced = true;
        }

        // Serial replay: strict document order, each node settled
        // before the next starts
        for serial in serials {
            let reused = serial
                .url
                .as_ref()
                .is_some_and(|url| known.contains(url));
            if reused {
                // Already loaded by the previous page: reactivate in
                // place, no reinsertion, no wait
                let mut live = shared.write();
                if let Some(node) = live.find_mut(serial.node) {
                    node.activate();
                    report.executed.push(ReplayedNode {
                        node: serial.node,
                        tag: serial.tag.clone(),
                        url: serial.url.clone(),
                        reused: true,
                    });
                }
                continue;
            }

            if let Some(url) = &serial.url {
                if let Some(handle) = preloads.remove(url) {
                    match handle.await {
                        Ok(true) => report.preloaded.push(url.clone()),
                        _ => report.preload_failures.push(url.clone()),
                    }
                }
            }

            let copy_ref = {
                let mut live = shared.write();
                match live.find(serial.node).cloned() {
                    Some(original) => {
                        let copy = original.activated_copy();
                        let copy_ref = copy.resource_ref();
                        live.replace(serial.node, copy);
                        Some(copy_ref)
                    }
                    // The head diff kept an equivalent live node; this
                    // incoming node never joined the document
                    None => None,
                }
            };
            let Some(copy_ref) = copy_ref else {
                tracing::debug!(node = %serial.node, "skipping node absent from live document");
                continue;
            };

            if copy_ref.url.is_some() {
                tracing::debug!(url = ?copy_ref.url, "async node loading");
                self.readiness.node(&copy_ref).await;
            } else {
                tracing::debug!("inline node loading");
                tokio::task::yield_now().await;
            }
            report.executed.push(ReplayedNode {
                node: copy_ref.node,
                tag: copy_ref.tag.clone(),
                url: copy_ref.url.clone(),
                reused: false,
            });
        }

        Ok(report)
    }
}

fn neutralize_deferrable(el: &mut Element, out: &mut Vec<ResourceRef>) {
    if el.is_deferrable() {
        el.neutralize();
        out.push(el.resource_ref());
    }
    for child in el.children_mut() {
        if let Some(child_el) = child.as_element_mut() {
            neutralize_deferrable(child_el, out);
        }
    }
}

/// Root merge: copy all incoming attributes, drop the ones the incoming
/// root does not carry.
fn merge_root_attributes(live: &mut Element, incoming: &Element) -> usize {
    let mut changes = 0;
    for attr in incoming.attributes() {
        if live.attr(&attr.name) != Some(attr.value.as_str()) {
            live.set_attr(attr.name.clone(), attr.value.clone());
            changes += 1;
        }
    }
    let stale: Vec<String> = live
        .attributes()
        .iter()
        .filter(|attr| !incoming.has_attr(&attr.name))
        .map(|attr| attr.name.clone())
        .collect();
    for name in stale {
        live.remove_attr(&name);
        changes += 1;
    }
    changes
}

/// Head attribute merge: minimal edit script keyed by (name, value).
fn merge_attributes(live: &mut Element, incoming: &Element) -> usize {
    let patches = list_diff(live.attributes(), incoming.attributes(), Attribute::key);
    if patches.is_empty() {
        return 0;
    }
    let count = patches.len();
    let mut attrs = live.attributes().to_vec();
    for patch in patches {
        match patch {
            ListPatch::Insert { index, item } => attrs.insert(index, item),
            ListPatch::Replace { index, item } => attrs[index] = item,
            ListPatch::Remove { index } => {
                attrs.remove(index);
            }
        }
    }
    live.set_attributes(attrs);
    count
}

/// Head child merge: minimal edit script keyed by (tag, resource URL)
/// when a URL exists, else the serialized markup. Unchanged nodes are
/// left untouched, keeping their loaded resources alive.
fn merge_children(live: &mut Element, incoming: &Element) -> usize {
    let from: Vec<Element> = live.child_elements().into_iter().cloned().collect();
    let to: Vec<Element> = incoming.child_elements().into_iter().cloned().collect();
    let patches = list_diff(&from, &to, Element::child_key);
    if patches.is_empty() {
        return 0;
    }
    let count = patches.len();
    let mut children = from;
    for patch in patches {
        match patch {
            ListPatch::Insert { index, item } => children.insert(index, item),
            ListPatch::Replace { index, item } => children[index] = item,
            ListPatch::Remove { index } => {
                children.remove(index);
            }
        }
    }
    *live.children_mut() = children.into_iter().map(Node::Element).collect();
    count
}
