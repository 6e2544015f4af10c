//! Termination barrier: counts live tasks; `close` waits for the count to reach zero.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Clone, Debug)]
pub(crate) struct Barrier(Arc<watch::Sender<usize>>);

impl Barrier {
    pub(crate) fn new() -> Self {
        Self(Arc::new(watch::Sender::new(0)))
    }

    pub(crate) fn enter(&self) {
        self.0.send_modify(|n| *n += 1);
    }

    pub(crate) fn leave(&self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }

    pub(crate) fn live(&self) -> usize {
        *self.0.borrow()
    }

    /// Suspends until no task holds the barrier.
    pub(crate) async fn wait(&self) {
        let mut rx = self.0.subscribe();
        // `self` keeps the sender alive, so this only returns at zero.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}
