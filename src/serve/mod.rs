// src/serve/mod.rs

//! Live reload channel and the development HTTP server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

pub mod server;

pub use server::{ServerOptions, router, spawn_server};

/// Generation counter shared between the executor and connected browsers.
///
/// Every successful task bumps the generation; clients long-poll until it
/// moves past the value they last saw. Bumping never blocks, with or
/// without listeners.
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub fn generation(&self) -> u64 {
        *self.tx.borrow()
    }

    /// Signal connected clients to reload.
    pub fn notify(&self, task: &str) {
        self.tx.send_modify(|generation| *generation += 1);
        debug!(task = %task, generation = self.generation(), "live reload signalled");
    }

    /// Wait until the generation exceeds `since`, or `timeout` elapses.
    /// Returns the current generation either way.
    pub async fn wait_past(&self, since: u64, timeout: Duration) -> u64 {
        let mut rx = self.tx.subscribe();
        let changed = rx.wait_for(|generation| *generation > since);
        match tokio::time::timeout(timeout, changed).await {
            Ok(Ok(generation)) => *generation,
            _ => self.generation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn waiters_wake_on_notify() {
        let reload = LiveReload::new();
        let waiter = {
            let reload = reload.clone();
            tokio::spawn(async move { reload.wait_past(0, Duration::from_secs(5)).await })
        };

        tokio::task::yield_now().await;
        reload.notify("styles");
        assert_eq!(waiter.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn wait_times_out_with_current_generation() {
        let reload = LiveReload::new();
        reload.notify("pages");
        let generation = reload.wait_past(1, Duration::from_millis(20)).await;
        assert_eq!(generation, 1);
    }

    #[tokio::test]
    async fn already_past_returns_immediately() {
        let reload = LiveReload::new();
        reload.notify("pages");
        reload.notify("pages");
        assert_eq!(reload.wait_past(0, Duration::from_secs(5)).await, 2);
    }
}
