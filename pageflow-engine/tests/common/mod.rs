//! Shared harness for engine integration tests.

#![allow(dead_code)]

use pageflow_core::dom::{parse, Document};
use pageflow_core::testing::{MemoryHost, MockFetch};
use pageflow_core::traits::PageHost;
use pageflow_core::{PageError, PageResult, Stage, STAGES};
use pageflow_engine::{Engine, Listener, NavigationState, RouteFuture, Router, StageBus};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared log of fired stages, as `"<stage>@<pathname>"` entries.
pub type StageLog = Arc<Mutex<Vec<String>>>;

pub fn stage_log() -> StageLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &StageLog) -> Vec<String> {
    log.lock().clone()
}

/// A listener appending `"<stage>@<pathname>"` to the log.
pub fn stage_recorder(log: &StageLog) -> Listener {
    let log = Arc::clone(log);
    Listener::sync(move |state: Arc<NavigationState>| {
        let stage = state.stage().map_or("", Stage::as_str);
        log.lock()
            .push(format!("{}@{}", stage, state.address().pathname));
    })
}

/// Observe every stage on a page channel (like document scripts would):
/// fires for whatever state runs, until the document is replaced.
pub fn observe_page(engine: &Engine, log: &StageLog) {
    observe_page_stages(engine, log, &STAGES);
}

/// Observe a subset of stages on a page channel.
pub fn observe_page_stages(engine: &Engine, log: &StageLog, stages: &[Stage]) {
    let channel = engine.bus().page_channel();
    for stage in stages {
        let listener = stage_recorder(log);
        engine.bus().subscribe(channel, *stage, &listener);
    }
}

/// Observe stages on a state's own emitter channel.
pub fn observe_state(
    state: &Arc<NavigationState>,
    bus: &StageBus,
    log: &StageLog,
    stages: &[Stage],
) {
    for stage in stages {
        let listener = stage_recorder(log);
        let _ = state.chain(bus, *stage, &listener);
    }
}

/// A state parsed against the host's location.
pub fn state_at(host: &MemoryHost, input: &str) -> Arc<NavigationState> {
    let base = host.location();
    Arc::new(NavigationState::from_address(
        pageflow_core::address::parse(input, &base).expect("test address must parse"),
    ))
}

/// A host whose live document is the given HTML.
pub fn host_with_document(location: &str, html: &str) -> MemoryHost {
    let host = MemoryHost::new(location);
    host.set_document(parse(html).expect("test document must parse"));
    host
}

/// An engine over the host with a declining router (no fetch, no
/// merge): runs are pure stage replays against the live document.
pub fn engine_without_routing(host: &MemoryHost) -> Arc<Engine> {
    Arc::new(
        Engine::builder(Arc::new(host.clone()))
            .with_router(Arc::new(DecliningRouter::default()))
            .build(),
    )
}

/// An engine over the host using the default router and the given mock
/// fetcher.
pub fn engine_with_fetch(host: &MemoryHost, fetch: MockFetch) -> Arc<Engine> {
    Arc::new(
        Engine::builder(Arc::new(host.clone()))
            .with_fetcher(Arc::new(fetch))
            .build(),
    )
}

/// Router producing no document, counting invocations.
#[derive(Default)]
pub struct DecliningRouter {
    pub count: AtomicUsize,
}

impl DecliningRouter {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Router for DecliningRouter {
    fn route(&self, _state: &Arc<NavigationState>) -> RouteFuture<'_> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(None) })
    }
}

/// Router producing the same document every time.
pub struct StaticRouter {
    pub html: String,
}

impl StaticRouter {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
        }
    }
}

impl Router for StaticRouter {
    fn route(&self, _state: &Arc<NavigationState>) -> RouteFuture<'_> {
        let doc: PageResult<Document> = parse(&self.html);
        Box::pin(async move { doc.map(Some) })
    }
}

/// Router declining slowly, for overlap tests.
pub struct SlowRouter {
    pub delay_ms: u64,
}

impl Router for SlowRouter {
    fn route(&self, _state: &Arc<NavigationState>) -> RouteFuture<'_> {
        let delay = std::time::Duration::from_millis(self.delay_ms);
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(None)
        })
    }
}

/// Router failing with a fixed error.
pub struct FailingRouter {
    pub error: PageError,
}

impl Router for FailingRouter {
    fn route(&self, _state: &Arc<NavigationState>) -> RouteFuture<'_> {
        let error = self.error.clone();
        Box::pin(async move { Err(error) })
    }
}
