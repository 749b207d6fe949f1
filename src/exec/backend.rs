// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender,
//! so tests can swap in a fake executor that records scheduled tasks and
//! emits `TaskCompleted` events directly.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};
use crate::exec::ExecContext;

use super::executor_loop::spawn_executor;

/// How scheduled tasks get executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks. Completion is reported asynchronously as
    /// `RuntimeEvent::TaskCompleted`.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: forwards tasks to the background executor loop.
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ScheduledTask>,
}

impl RealExecutorBackend {
    /// Spawns the background executor loop immediately.
    pub fn new(ctx: ExecContext, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_executor(ctx, runtime_tx);
        Self { tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for task in tasks {
                tx.send(task).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}
