//! Integration tests for navigation serialization.

mod common;

use common::{entries, host_with_document, observe_page, stage_log, state_at, SlowRouter};
use pageflow_engine::Engine;
use std::sync::Arc;

const PLAIN_PAGE: &str = "<html><head></head><body></body></html>";

#[tokio::test]
async fn concurrent_runs_execute_one_at_a_time() {
    let host = host_with_document("https://example.com/", PLAIN_PAGE);
    let engine = Arc::new(
        Engine::builder(Arc::new(host.clone()))
            .with_router(Arc::new(SlowRouter { delay_ms: 20 }))
            .build(),
    );
    let log = stage_log();
    observe_page(&engine, &log);

    let first = state_at(&host, "/a");
    first.set_prerender(Some(false));
    let second = state_at(&host, "/b");
    second.set_prerender(Some(false));

    // Both runs are issued concurrently; the router sleeps mid-sequence
    // so an unserialized engine would interleave their stages
    let engine_a = Arc::clone(&engine);
    let task_a = tokio::spawn(async move { engine_a.run(first).await });
    tokio::task::yield_now().await;
    let engine_b = Arc::clone(&engine);
    let task_b = tokio::spawn(async move { engine_b.run(second).await });

    let state_a = task_a.await.unwrap().unwrap();
    let state_b = task_b.await.unwrap().unwrap();

    let log = entries(&log);
    let last_a = log.iter().rposition(|e| e.ends_with("@/a")).unwrap();
    let first_b = log.iter().position(|e| e.ends_with("@/b")).unwrap();
    assert!(
        last_a < first_b,
        "second navigation started before the first settled: {log:?}"
    );
    assert!(log.contains(&"setup@/a".to_string()));
    assert!(log.contains(&"setup@/b".to_string()));
    assert_eq!(state_a.address().pathname, "/a");
    assert_eq!(state_b.address().pathname, "/b");
}

#[tokio::test]
async fn queue_is_empty_after_completion() {
    let host = host_with_document("https://example.com/", PLAIN_PAGE);
    let engine = common::engine_without_routing(&host);

    engine.boot().await.unwrap();
    assert!(engine.queue().is_idle());

    // A later navigation starts immediately instead of waiting on
    // stale queue state
    engine.push("/again").await.unwrap();
    assert!(engine.queue().is_idle());
}
