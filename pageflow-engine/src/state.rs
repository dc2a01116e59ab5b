//! Navigation state.
//!
//! One `NavigationState` per navigation attempt. The address is fixed at
//! creation; everything else (stage pointer, chains, referrer, data,
//! prerender flag, error) mutates under a short-lived lock as the run
//! driver advances. States are `Arc`-shared: listeners receive the state
//! they fired on, and a retired state lives on as the next navigation's
//! referrer.

use crate::chain::{ChainAck, Listener, StageBus};
use pageflow_core::address::{self, Address};
use pageflow_core::{ChannelId, HistoryEntry, PageError, PageResult, Stage, StateId};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Per-stage dispatch bookkeeping.
#[derive(Debug, Default, Clone)]
pub struct ChainRecord {
    /// Listeners invoked during the current firing of the stage.
    pub count: usize,
}

#[derive(Default)]
struct StateInner {
    referrer: Option<Arc<NavigationState>>,
    stage: Option<Stage>,
    chains: HashMap<Stage, ChainRecord>,
    data: Map<String, Value>,
    prerender: Option<bool>,
    emitter: Option<ChannelId>,
    error: Option<PageError>,
}

/// One navigation attempt's data, stage pointer and listener chains.
pub struct NavigationState {
    id: StateId,
    address: Address,
    inner: Mutex<StateInner>,
}

impl NavigationState {
    /// A state for a parsed address.
    #[must_use]
    pub fn from_address(address: Address) -> Self {
        Self {
            id: StateId::new(),
            address,
            inner: Mutex::new(StateInner::default()),
        }
    }

    /// A state with no address at all.
    ///
    /// Used as the referrer of a first load or a forced reload: its
    /// empty pathname never matches a real one, so the run always
    /// routes.
    #[must_use]
    pub fn detached() -> Self {
        Self::from_address(Address::empty())
    }

    /// Rebuild a state from a persisted history payload.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::AddressParse`] when the payload's href does
    /// not parse against the current location.
    pub fn from_entry(entry: &HistoryEntry, base: &Url) -> PageResult<Self> {
        let state = Self::from_address(address::parse(&entry.href, base)?);
        {
            let mut inner = state.inner.lock();
            inner.data = entry.data.clone();
            inner.prerender = Some(entry.prerender);
            inner.stage = entry.stage;
        }
        Ok(state)
    }

    /// A copy carrying this state's data, prerender flag, stage and
    /// emitter channel, but fresh chains and no referrer.
    #[must_use]
    pub fn copy(&self) -> Self {
        let copy = Self::from_address(self.address.clone());
        {
            let from = self.inner.lock();
            let mut inner = copy.inner.lock();
            inner.data = from.data.clone();
            inner.prerender = from.prerender;
            inner.stage = from.stage;
            inner.emitter = from.emitter;
        }
        copy
    }

    /// Like [`copy`](Self::copy) but stripped of all address fields,
    /// forcing a full re-route when used as referrer.
    #[must_use]
    pub fn detached_copy(&self) -> Self {
        let copy = self.copy();
        Self {
            id: copy.id,
            address: Address::empty(),
            inner: copy.inner,
        }
    }

    /// The state's identity.
    #[must_use]
    pub fn id(&self) -> StateId {
        self.id
    }

    /// The navigation address.
    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The hash fragment, if any.
    #[must_use]
    pub fn hash(&self) -> Option<String> {
        self.address.hash.clone()
    }

    /// Current stage, `None` before the run reaches `init`.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        self.inner.lock().stage
    }

    /// Set the stage pointer without dispatching.
    pub fn set_stage(&self, stage: Option<Stage>) {
        self.inner.lock().stage = stage;
    }

    /// The state being navigated away from.
    #[must_use]
    pub fn referrer(&self) -> Option<Arc<NavigationState>> {
        self.inner.lock().referrer.clone()
    }

    /// Set the referrer.
    pub fn set_referrer(&self, referrer: Arc<NavigationState>) {
        self.inner.lock().referrer = Some(referrer);
    }

    /// Whether this navigation runs before the page became visible.
    /// `None` until determined.
    #[must_use]
    pub fn prerender(&self) -> Option<bool> {
        self.inner.lock().prerender
    }

    /// Set the prerender flag.
    pub fn set_prerender(&self, prerender: Option<bool>) {
        self.inner.lock().prerender = prerender;
    }

    /// The opaque data payload.
    #[must_use]
    pub fn data(&self) -> Map<String, Value> {
        self.inner.lock().data.clone()
    }

    /// Replace the data payload.
    pub fn set_data(&self, data: Map<String, Value>) {
        self.inner.lock().data = data;
    }

    /// Insert one data value.
    pub fn insert_data(&self, key: impl Into<String>, value: Value) {
        self.inner.lock().data.insert(key.into(), value);
    }

    /// The error recorded by a failed run, if any.
    #[must_use]
    pub fn error(&self) -> Option<PageError> {
        self.inner.lock().error.clone()
    }

    /// Record a run failure.
    pub fn set_error(&self, error: PageError) {
        self.inner.lock().error = Some(error);
    }

    /// The state's emitter channel, if one was created.
    #[must_use]
    pub fn emitter(&self) -> Option<ChannelId> {
        self.inner.lock().emitter
    }

    /// Adopt an emitter channel (same-document navigations reuse the
    /// referrer's).
    pub fn set_emitter(&self, channel: ChannelId) {
        self.inner.lock().emitter = Some(channel);
    }

    /// The emitter channel, created on first use.
    pub fn ensure_emitter(&self, bus: &StageBus) -> ChannelId {
        let mut inner = self.inner.lock();
        match inner.emitter {
            Some(channel) => channel,
            None => {
                let channel = bus.state_channel();
                inner.emitter = Some(channel);
                channel
            }
        }
    }

    /// Detach the state from its emitter channel.
    ///
    /// Runs do this first thing, in case an already used state was
    /// given: listeners from the state's previous life must not fire
    /// for its new stages. The channel itself keeps its registrations;
    /// a referrer holding it (reload) still dispatches `close` there.
    pub fn clear_emitter(&self) {
        self.inner.lock().emitter = None;
    }

    /// How many listeners the last firing of a stage invoked.
    #[must_use]
    pub fn chain_count(&self, stage: Stage) -> usize {
        self.inner
            .lock()
            .chains
            .get(&stage)
            .map_or(0, |chain| chain.count)
    }

    /// The history payload persisting this state.
    #[must_use]
    pub fn to_entry(&self, base: &Url) -> HistoryEntry {
        let inner = self.inner.lock();
        HistoryEntry {
            href: address::format(&self.address, base),
            data: inner.data.clone(),
            prerender: false,
            stage: inner.stage,
        }
    }

    /// Register `listener` to run when `stage` fires on this state.
    ///
    /// Registration is keyed by `(listener, stage)`: chaining the same
    /// listener again for the same stage is a logged no-op. When the
    /// requested stage has already fired (its index is at or before the
    /// state's current stage), the handler is replayed once, deferred to
    /// the next scheduling tick; the returned ack settles after that
    /// replay. Otherwise the ack is already complete; the handler will
    /// run in-band when the stage fires.
    pub fn chain(self: &Arc<Self>, bus: &StageBus, stage: Stage, listener: &Listener) -> ChainAck {
        let channel = self.ensure_emitter(bus);
        bus.subscribe(channel, stage, listener);

        let current = self.stage().map_or(0, Stage::index);
        if stage.index() <= current {
            if let Some(callback) = listener.resolve(stage) {
                tracing::debug!(state = %self.id, stage = %stage, "chain has run, deferred replay");
                let state = Arc::clone(self);
                let handle = tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    if let Err(err) = callback(Arc::clone(&state)).await {
                        tracing::error!(
                            state = %state.id(),
                            stage = %stage,
                            error = %err,
                            "stage listener failed"
                        );
                    }
                });
                return Box::pin(async move {
                    let _ = handle.await;
                });
            }
        } else {
            tracing::debug!(state = %self.id, stage = %stage, "chain pending");
        }
        Box::pin(std::future::ready(()))
    }

    /// Remove a prior registration. No-op if absent.
    pub fn unchain(&self, bus: &StageBus, stage: Stage, listener: &Listener) {
        bus.unsubscribe(stage, listener.id());
    }

    /// Fire a stage on this state.
    ///
    /// Sets the stage pointer, resets the chain count, then invokes
    /// every matching listener in registration order, awaiting each. A
    /// listener's failure is logged and isolated; the chain continues.
    /// Returns how many listeners fired; zero means the caller may
    /// treat the stage as already complete (and fall back, as `patch`
    /// does to `build` on query-only navigations).
    pub async fn run_chain(self: &Arc<Self>, bus: &StageBus, stage: Stage) -> usize {
        let emitter = {
            let mut inner = self.inner.lock();
            inner.stage = Some(stage);
            inner.chains.insert(stage, ChainRecord::default());
            inner.emitter
        };
        tracing::debug!(state = %self.id, event = stage.event_name(), "run chain");

        let callbacks = bus.callbacks_for(emitter, stage);
        let mut count = 0;
        for (listener, callback) in callbacks {
            count += 1;
            if let Some(chain) = self.inner.lock().chains.get_mut(&stage) {
                chain.count = count;
            }
            if let Err(err) = callback(Arc::clone(self)).await {
                tracing::error!(
                    state = %self.id,
                    stage = %stage,
                    listener = %listener,
                    error = %err,
                    "stage listener failed"
                );
            }
        }
        tracing::debug!(state = %self.id, stage = %stage, count, "run chain count");
        count
    }
}

impl std::fmt::Debug for NavigationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("NavigationState")
            .field("id", &self.id)
            .field("pathname", &self.address.pathname)
            .field("stage", &inner.stage)
            .field("prerender", &inner.prerender)
            .finish()
    }
}
