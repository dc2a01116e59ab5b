//! Integration tests for failure semantics.
//!
//! Router errors drive the error stage; redirect signals are swallowed;
//! referrer aliasing is the one fatal error.

mod common;

use common::{entries, host_with_document, observe_page, stage_log, state_at, FailingRouter};
use pageflow_core::traits::PageHost;
use pageflow_core::{PageError, Stage};
use pageflow_engine::Engine;
use std::sync::Arc;

const PLAIN_PAGE: &str = "<html><head></head><body></body></html>";

fn engine_with_router(
    host: &pageflow_core::testing::MemoryHost,
    router: Arc<dyn pageflow_engine::Router>,
) -> Arc<Engine> {
    Arc::new(
        Engine::builder(Arc::new(host.clone()) as Arc<dyn PageHost>)
            .with_router(router)
            .build(),
    )
}

#[tokio::test]
async fn router_error_reaches_the_error_stage() {
    let host = host_with_document("https://example.com/start", PLAIN_PAGE);
    let engine = engine_with_router(
        &host,
        Arc::new(FailingRouter {
            error: PageError::RouterFetch {
                url: "/start".to_string(),
                cause: "boom".to_string(),
            },
        }),
    );
    let log = stage_log();
    observe_page(&engine, &log);

    let state = engine.boot().await.unwrap();

    let error = state.error().expect("error must be recorded");
    assert_eq!(error.code(), "E202");
    assert_eq!(state.stage(), Some(Stage::Error));
    // The run got as far as init, then jumped to the error stage
    assert_eq!(entries(&log), vec!["init@/start", "error@/start"]);
}

#[tokio::test]
async fn error_listeners_see_the_populated_state() {
    let host = host_with_document("https://example.com/start", PLAIN_PAGE);
    let engine = engine_with_router(
        &host,
        Arc::new(FailingRouter {
            error: PageError::RouterFetch {
                url: "/start".to_string(),
                cause: "unreachable".to_string(),
            },
        }),
    );

    let seen = Arc::new(parking_lot::Mutex::new(None));
    let sink = Arc::clone(&seen);
    let listener = pageflow_engine::Listener::sync(move |state| {
        *sink.lock() = state.error().map(|e| e.code());
    });
    let channel = engine.bus().page_channel();
    engine.bus().subscribe(channel, Stage::Error, &listener);

    engine.boot().await.unwrap();
    assert_eq!(*seen.lock(), Some("E202"));
}

#[tokio::test]
async fn redirect_signal_is_swallowed_silently() {
    let host = host_with_document("https://example.com/start", PLAIN_PAGE);
    let engine = engine_with_router(
        &host,
        Arc::new(FailingRouter {
            error: PageError::Redirect { code: 302 },
        }),
    );
    let log = stage_log();
    observe_page(&engine, &log);

    let state = engine.boot().await.unwrap();

    assert!(state.error().is_none(), "redirects must not be recorded");
    assert!(
        !entries(&log).iter().any(|e| e.starts_with("error@")),
        "redirects must not fire the error stage"
    );
}

#[tokio::test]
async fn aliased_referrer_is_fatal() {
    let host = host_with_document("https://example.com/start", PLAIN_PAGE);
    let engine = common::engine_without_routing(&host);

    let state = state_at(&host, "/start");
    state.set_referrer(Arc::clone(&state));

    let err = engine.run(state).await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.code(), "E001");
}

#[tokio::test]
async fn failure_after_stages_still_returns_the_state() {
    let host = host_with_document("https://example.com/start", PLAIN_PAGE);
    let engine = engine_with_router(
        &host,
        Arc::new(FailingRouter {
            error: PageError::EmptyDocument {
                url: "/start".to_string(),
                status: 500,
                status_text: "Internal Server Error".to_string(),
            },
        }),
    );

    // Contained failure: run resolves with the state, not an Err
    let state = engine.boot().await.unwrap();
    assert_eq!(state.error().unwrap().code(), "E203");
    // And the engine still binds it as current
    assert!(Arc::ptr_eq(&engine.current().unwrap(), &state));
}
