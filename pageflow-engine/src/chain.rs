//! Stage listener chains.
//!
//! The stage bus is the typed replacement for DOM-event dispatch:
//! listeners subscribe on a channel for a stage, and dispatch invokes
//! them strictly in registration order, awaiting each before the next.
//!
//! Channels scope listener lifetime. Page channels belong to a document
//! generation: when reconciliation replaces the document, its channels
//! go stale: they stop receiving stages immediately and are swept at
//! the next navigation's clearing step. A state's emitter channel lives
//! with the state and is reused across same-document stage replays.

use crate::state::NavigationState;
use pageflow_core::{ChannelId, ListenerId, PageResult, Stage};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed stage-handler future.
pub type StageFuture = Pin<Box<dyn Future<Output = PageResult<()>> + Send>>;

/// A stage handler: an async closure over the navigation state.
pub type StageFn = Arc<dyn Fn(Arc<NavigationState>) -> StageFuture + Send + Sync>;

/// Acknowledgement returned by a chain registration.
///
/// Already complete when the handler will run in-band at its stage;
/// when the stage has already fired, the ack settles after the deferred
/// replay of the handler finishes.
pub type ChainAck = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A per-stage handler map, for listeners that handle several stages
/// with distinct callbacks.
#[derive(Default)]
pub struct StageMap {
    map: HashMap<Stage, StageFn>,
}

impl StageMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handler for a stage.
    #[must_use]
    pub fn on<F, Fut>(mut self, stage: Stage, handler: F) -> Self
    where
        F: Fn(Arc<NavigationState>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PageResult<()>> + Send + 'static,
    {
        self.map
            .insert(stage, Arc::new(move |state| Box::pin(handler(state))));
        self
    }

    /// Set a synchronous handler for a stage.
    #[must_use]
    pub fn on_sync<F>(self, stage: Stage, handler: F) -> Self
    where
        F: Fn(Arc<NavigationState>) + Send + Sync + 'static,
    {
        self.on(stage, move |state| {
            handler(state);
            std::future::ready(Ok(()))
        })
    }
}

enum StageCallback {
    /// One callback for whatever stage the listener is chained to.
    Any(StageFn),
    /// A callback per stage; chaining to an uncovered stage is refused.
    PerStage(HashMap<Stage, StageFn>),
}

/// A registered stage handler with stable identity.
///
/// Identity is what makes registration idempotent: chaining the same
/// listener twice for the same stage is a logged no-op.
pub struct Listener {
    id: ListenerId,
    callback: StageCallback,
}

impl Listener {
    /// A listener from an async closure.
    #[must_use]
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Arc<NavigationState>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PageResult<()>> + Send + 'static,
    {
        Self {
            id: ListenerId::new(),
            callback: StageCallback::Any(Arc::new(move |state| Box::pin(handler(state)))),
        }
    }

    /// A listener from a synchronous closure.
    #[must_use]
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(Arc<NavigationState>) + Send + Sync + 'static,
    {
        Self::new(move |state| {
            handler(state);
            std::future::ready(Ok(()))
        })
    }

    /// A listener with per-stage handlers.
    #[must_use]
    pub fn for_stages(stages: StageMap) -> Self {
        Self {
            id: ListenerId::new(),
            callback: StageCallback::PerStage(stages.map),
        }
    }

    /// The listener's identity.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Resolve the callback this listener runs for a stage.
    pub(crate) fn resolve(&self, stage: Stage) -> Option<StageFn> {
        match &self.callback {
            StageCallback::Any(callback) => Some(Arc::clone(callback)),
            StageCallback::PerStage(map) => map.get(&stage).map(Arc::clone),
        }
    }
}

struct Subscription {
    channel: ChannelId,
    stage: Stage,
    listener: ListenerId,
    callback: StageFn,
}

#[derive(Default)]
struct BusInner {
    subs: Vec<Subscription>,
    /// Page channel -> the document generation it was created under.
    page_channels: HashMap<ChannelId, u64>,
    /// Bumped every time reconciliation replaces the document.
    generation: u64,
    registered: HashSet<(ListenerId, Stage)>,
}

impl BusInner {
    fn page_channel_live(&self, channel: ChannelId) -> bool {
        self.page_channels
            .get(&channel)
            .is_some_and(|gen| *gen == self.generation)
    }
}

/// The in-process event bus for stage dispatch.
#[derive(Default)]
pub struct StageBus {
    inner: Mutex<BusInner>,
}

impl StageBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a page-scoped channel, bound to the current document.
    /// Its subscriptions stop firing when the document is replaced.
    #[must_use]
    pub fn page_channel(&self) -> ChannelId {
        let id = ChannelId::next();
        let mut inner = self.inner.lock();
        let generation = inner.generation;
        inner.page_channels.insert(id, generation);
        id
    }

    /// Allocate a state-owned channel. Its subscriptions live until the
    /// channel is dropped.
    #[must_use]
    pub fn state_channel(&self) -> ChannelId {
        ChannelId::next()
    }

    /// Register a listener for a stage on a channel.
    ///
    /// Returns `false` (logged, no-op) when the same listener is
    /// already chained for the stage, or when a per-stage listener has
    /// no callback for it.
    pub fn subscribe(&self, channel: ChannelId, stage: Stage, listener: &Listener) -> bool {
        let Some(callback) = listener.resolve(stage) else {
            tracing::debug!(stage = %stage, listener = %listener.id(), "listener has no callback for stage");
            return false;
        };
        let mut inner = self.inner.lock();
        if !inner.registered.insert((listener.id(), stage)) {
            tracing::debug!(stage = %stage, listener = %listener.id(), "already chained");
            return false;
        }
        inner.subs.push(Subscription {
            channel,
            stage,
            listener: listener.id(),
            callback,
        });
        true
    }

    /// Remove a listener's registration for a stage. No-op if absent.
    pub fn unsubscribe(&self, stage: Stage, listener: ListenerId) {
        let mut inner = self.inner.lock();
        if inner.registered.remove(&(listener, stage)) {
            inner
                .subs
                .retain(|s| !(s.stage == stage && s.listener == listener));
        }
    }

    /// Drop a channel and everything registered on it.
    pub fn drop_channel(&self, channel: ChannelId) {
        let mut inner = self.inner.lock();
        inner.page_channels.remove(&channel);
        let mut removed = Vec::new();
        inner.subs.retain(|s| {
            if s.channel == channel {
                removed.push((s.listener, s.stage));
                false
            } else {
                true
            }
        });
        for key in removed {
            inner.registered.remove(&key);
        }
    }

    /// The document was replaced: every existing page channel is stale.
    pub fn bump_generation(&self) {
        self.inner.lock().generation += 1;
    }

    /// Drop page channels from previous documents and their
    /// registrations. Runs do this before dispatching any stage.
    pub fn sweep_stale_channels(&self) {
        let mut inner = self.inner.lock();
        let generation = inner.generation;
        let stale: HashSet<ChannelId> = inner
            .page_channels
            .iter()
            .filter(|(_, gen)| **gen != generation)
            .map(|(id, _)| *id)
            .collect();
        if stale.is_empty() {
            return;
        }
        inner.page_channels.retain(|id, _| !stale.contains(id));
        let mut removed = Vec::new();
        inner.subs.retain(|s| {
            if stale.contains(&s.channel) {
                removed.push((s.listener, s.stage));
                false
            } else {
                true
            }
        });
        tracing::debug!(count = removed.len(), "cleared stale page listeners");
        for key in removed {
            inner.registered.remove(&key);
        }
    }

    /// Callbacks a stage firing must invoke: every page-channel
    /// registration plus the state's emitter channel, in registration
    /// order.
    pub(crate) fn callbacks_for(
        &self,
        emitter: Option<ChannelId>,
        stage: Stage,
    ) -> Vec<(ListenerId, StageFn)> {
        let inner = self.inner.lock();
        inner
            .subs
            .iter()
            .filter(|s| {
                s.stage == stage
                    && (inner.page_channel_live(s.channel) || Some(s.channel) == emitter)
            })
            .map(|s| (s.listener, Arc::clone(&s.callback)))
            .collect()
    }

    /// Total number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.lock().subs.len()
    }
}
