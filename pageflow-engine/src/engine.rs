//! The navigation engine.
//!
//! Wires host, stage bus, run-queue, readiness waits, router and
//! reconciler, and drives one navigation at a time through the fixed
//! stage sequence.

use crate::chain::{ChainAck, Listener, StageBus};
use crate::config::EngineConfig;
use crate::queue::RunQueue;
use crate::reconcile::Reconciler;
use crate::router::{DefaultRouter, Router};
use crate::state::NavigationState;
use crate::wait::Readiness;
use pageflow_core::address;
use pageflow_core::traits::{DocumentBuilder, Fetcher, HtmlDocumentBuilder, HyperFetcher, PageHost};
use pageflow_core::{PageError, PageResult, Stage};
use parking_lot::Mutex;
use std::sync::Arc;

/// The root attribute marking a document that has been through the
/// lifecycle once. One-way: set on every address-changing run, only
/// read before that to detect a genuinely prerendered page.
const PRERENDER_MARKER: &str = "data-prerender";

/// Builder for [`Engine`].
pub struct EngineBuilder {
    host: Arc<dyn PageHost>,
    fetcher: Option<Arc<dyn Fetcher>>,
    document_builder: Option<Arc<dyn DocumentBuilder>>,
    router: Option<Arc<dyn Router>>,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Start building an engine over a host.
    #[must_use]
    pub fn new(host: Arc<dyn PageHost>) -> Self {
        Self {
            host,
            fetcher: None,
            document_builder: None,
            router: None,
            config: EngineConfig::default(),
        }
    }

    /// Use a custom fetcher (default: the hyper-backed one).
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Use a custom document builder (default: the crate's HTML parser).
    #[must_use]
    pub fn with_document_builder(mut self, builder: Arc<dyn DocumentBuilder>) -> Self {
        self.document_builder = Some(builder);
        self
    }

    /// Use a custom router (default: network fetch of the formatted
    /// address, disabled after a non-prerendered referrer).
    #[must_use]
    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = Some(router);
        self
    }

    /// Use a custom configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the engine.
    #[must_use]
    pub fn build(self) -> Engine {
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(HyperFetcher::new()));
        let document_builder = self
            .document_builder
            .unwrap_or_else(|| Arc::new(HtmlDocumentBuilder::new()));
        let router = self.router.unwrap_or_else(|| {
            Arc::new(DefaultRouter::new(
                Arc::clone(&self.host),
                Arc::clone(&fetcher),
                Arc::clone(&document_builder),
                self.config.router_timeout_ms,
            ))
        });
        let readiness = Arc::new(Readiness::new(Arc::clone(&self.host)));
        let reconciler = Reconciler::new(
            Arc::clone(&self.host),
            Arc::clone(&fetcher),
            Arc::clone(&readiness),
            self.config.preload_timeout_ms,
        );
        Engine {
            host: self.host,
            router,
            bus: Arc::new(StageBus::new()),
            queue: Arc::new(RunQueue::new()),
            readiness,
            reconciler,
            config: self.config,
            current: Mutex::new(None),
        }
    }
}

/// The lifecycle orchestration engine.
pub struct Engine {
    host: Arc<dyn PageHost>,
    router: Arc<dyn Router>,
    bus: Arc<StageBus>,
    queue: Arc<RunQueue>,
    readiness: Arc<Readiness>,
    reconciler: Reconciler,
    config: EngineConfig,
    current: Mutex<Option<Arc<NavigationState>>>,
}

impl Engine {
    /// Start building an engine over a host.
    #[must_use]
    pub fn builder(host: Arc<dyn PageHost>) -> EngineBuilder {
        EngineBuilder::new(host)
    }

    /// The page host.
    #[must_use]
    pub fn host(&self) -> &Arc<dyn PageHost> {
        &self.host
    }

    /// The stage bus.
    #[must_use]
    pub fn bus(&self) -> &StageBus {
        &self.bus
    }

    /// The run-queue.
    #[must_use]
    pub fn queue(&self) -> &RunQueue {
        &self.queue
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The currently bound navigation state, if any run has started.
    #[must_use]
    pub fn current(&self) -> Option<Arc<NavigationState>> {
        self.current.lock().clone()
    }

    /// Bind the global subscribe surface to a state. Idempotent; every
    /// run does this first.
    pub fn attach(&self, state: &Arc<NavigationState>) {
        *self.current.lock() = Some(Arc::clone(state));
    }

    /// Subscribe a listener for a stage on the current state.
    ///
    /// This is the application-facing registrar pair (`on`/`off`), bound
    /// to whichever state is currently running.
    pub fn on(&self, stage: Stage, listener: &Listener) -> ChainAck {
        match self.current() {
            Some(state) => state.chain(&self.bus, stage, listener),
            None => {
                tracing::warn!(stage = %stage, "no active navigation state to chain on");
                Box::pin(std::future::ready(()))
            }
        }
    }

    /// Unsubscribe a listener from a stage.
    pub fn off(&self, stage: Stage, listener: &Listener) {
        self.bus.unsubscribe(stage, listener.id());
    }

    /// First load: run the document's own location through the
    /// lifecycle, and persist it if history carries no entry yet.
    ///
    /// # Errors
    ///
    /// Fatal setup errors only; anything else is contained in the run.
    pub async fn boot(&self) -> PageResult<Arc<NavigationState>> {
        let base = self.host.location();
        let state = Arc::new(NavigationState::from_address(address::parse("", &base)?));
        let state = self.run(state).await?;
        if self.host.history_state().is_none() {
            self.save()?;
        }
        Ok(state)
    }

    /// Run a navigation through the queue.
    ///
    /// At most one navigation executes its stage sequence at a time;
    /// concurrent calls run FIFO. Returns the state in all cases except
    /// a fatal setup error; run failures are recorded on the state and
    /// surfaced through the `error` stage instead.
    ///
    /// # Errors
    ///
    /// [`PageError::ReferrerAliased`] when the state is its own
    /// referrer.
    pub async fn run(&self, state: Arc<NavigationState>) -> PageResult<Arc<NavigationState>> {
        self.queue.enqueue(self.run_now(state)).await
    }

    async fn run_now(&self, state: Arc<NavigationState>) -> PageResult<Arc<NavigationState>> {
        self.attach(&state);

        let refer = match state.referrer() {
            Some(refer) => refer,
            None => {
                tracing::debug!(state = %state.id(), "new referrer");
                let base = self.host.location();
                let refer = match self.host.document_referrer() {
                    Some(referrer) => match address::parse(&referrer, &base) {
                        Ok(addr) => NavigationState::from_address(addr),
                        Err(_) => NavigationState::detached(),
                    },
                    None => NavigationState::detached(),
                };
                let refer = Arc::new(refer);
                state.set_referrer(Arc::clone(&refer));
                refer
            }
        };
        if Arc::ptr_eq(&state, &refer) {
            return Err(PageError::ReferrerAliased);
        }
        // In case an already used state has been given
        state.clear_emitter();

        let base = self.host.location();
        let same_pathname = address::same_pathname(state.address(), refer.address(), &base);

        let outcome = self.stages(&state, &refer, same_pathname).await;
        if let Err(err) = outcome {
            if err.is_redirect() {
                tracing::debug!(state = %state.id(), error = %err, "redirect signal, abandoning navigation");
            } else {
                tracing::error!(state = %state.id(), code = err.code(), error = %err, "navigation failed");
                state.set_error(err);
                state.run_chain(&self.bus, Stage::Error).await;
            }
        }
        Ok(state)
    }

    /// Steps 3-10 of the run: everything that may fail into the error
    /// stage.
    async fn stages(
        &self,
        state: &Arc<NavigationState>,
        refer: &Arc<NavigationState>,
        same_pathname: bool,
    ) -> PageResult<()> {
        self.readiness.dom().await;
        // The previous document's listeners are gone
        self.bus.sweep_stale_channels();
        if !same_pathname && refer.stage().is_some() {
            refer.run_chain(&self.bus, Stage::Close).await;
        }

        state.run_chain(&self.bus, Stage::Init).await;

        let doc = if !same_pathname || !refer.prerender().unwrap_or(false) {
            self.router.route(state).await?
        } else {
            // Same-document stage replay: reuse the referrer's emitter
            if state.emitter().is_none() {
                if let Some(channel) = refer.emitter() {
                    state.set_emitter(channel);
                }
            }
            None
        };

        if let Some(doc) = doc {
            let report = self.reconciler.merge(doc).await?;
            // Listeners of the replaced document must not see the
            // remaining stages
            self.bus.bump_generation();
            tracing::debug!(
                state = %state.id(),
                head_patches = report.head_patches(),
                executed = report.executed.len(),
                "document merged"
            );
        }

        if state.prerender().is_none() {
            state.set_prerender(Some(self.prerender_marker()));
        }
        let prerendering = state.prerender() == Some(true);
        state.set_stage(Some(if prerendering { Stage::Setup } else { Stage::Init }));
        tracing::debug!(state = %state.id(), stage = ?state.stage(), "doc ready");
        state.run_chain(&self.bus, Stage::Ready).await;

        if !prerendering && !same_pathname {
            state.run_chain(&self.bus, Stage::Build).await;
            // Patch fires even when build had no listeners
            state.run_chain(&self.bus, Stage::Patch).await;
        }

        if !same_pathname {
            self.mark_prerendered();
            self.readiness.ui().await;
            state.run_chain(&self.bus, Stage::Setup).await;
        } else if !address::same_query(state.address(), refer.address()) {
            if state.run_chain(&self.bus, Stage::Patch).await == 0 {
                state.run_chain(&self.bus, Stage::Build).await;
            }
        }

        if state.hash() != refer.hash() {
            state.run_chain(&self.bus, Stage::Hash).await;
        }
        Ok(())
    }

    fn prerender_marker(&self) -> bool {
        let doc = self.host.document();
        let marked = doc.read().root().attr(PRERENDER_MARKER) == Some("true");
        marked
    }

    fn mark_prerendered(&self) {
        let doc = self.host.document();
        doc.write().root_mut().set_attr(PRERENDER_MARKER, "true");
    }
}
