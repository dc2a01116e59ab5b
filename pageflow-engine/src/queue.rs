//! The navigation run-queue.
//!
//! A single process-wide pipeline: at most one navigation executes its
//! stage sequence at a time, and queued navigations run in FIFO order.
//! The tokio mutex backing the queue hands the lock to waiters in
//! arrival order, which is exactly the fairness the stage ordering
//! guarantee needs.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Serializes navigation runs.
///
/// Injectable so tests get isolated queues instead of sharing a
/// process-global.
#[derive(Debug, Default)]
pub struct RunQueue {
    gate: Mutex<()>,
    pending: AtomicUsize,
}

impl RunQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a navigation through the queue.
    ///
    /// The future starts only after every earlier enqueued navigation
    /// has settled; nothing else runs until it settles in turn.
    pub async fn enqueue<T>(&self, work: impl Future<Output = T>) -> T {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let _guard = self.gate.lock().await;
        tracing::trace!(pending = self.pending(), "navigation dequeued");
        let out = work.await;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        out
    }

    /// Navigations waiting or running.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Whether the queue has nothing in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn runs_complete_and_reset_queue() {
        let queue = RunQueue::new();
        let out = queue.enqueue(async { 7 }).await;
        assert_eq!(out, 7);
        assert!(queue.is_idle());
    }

    #[tokio::test]
    async fn serializes_in_fifo_order() {
        let queue = Arc::new(RunQueue::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut handles = Vec::new();
        for i in 0..4 {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .enqueue(async {
                        tx.send((i, "start")).unwrap();
                        tokio::task::yield_now().await;
                        tx.send((i, "end")).unwrap();
                    })
                    .await;
            }));
            // Make arrival order deterministic
            tokio::task::yield_now().await;
        }
        for handle in handles {
            handle.await.unwrap();
        }
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        // Every run's start/end pair is contiguous and runs are FIFO
        let expected: Vec<(usize, &str)> = (0..4)
            .flat_map(|i| [(i, "start"), (i, "end")])
            .collect();
        assert_eq!(events, expected);
        assert!(queue.is_idle());
    }
}
