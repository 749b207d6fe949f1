// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RunSummary, RuntimeEvent};

/// Async IO shell around [`CoreRuntime`].
///
/// Reads `RuntimeEvent`s from a channel, feeds them to the core, and hands
/// the tasks it schedules to an [`ExecutorBackend`].
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Main event loop. Returns the summary of every task run it handled.
    pub async fn run(mut self) -> Result<RunSummary> {
        info!("sitepipe runtime started");

        loop {
            let Some(event) = self.event_rx.recv().await else {
                info!("runtime event channel closed; exiting");
                break;
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        let summary = self.core.into_summary();
        info!(
            succeeded = summary.succeeded.len(),
            failed = summary.failed.len(),
            blocked = summary.blocked.len(),
            "runtime exiting"
        );
        Ok(summary)
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await,
            // keep_running=false already ends the loop.
            CoreCommand::RequestExit => {
                debug!("core issued RequestExit command");
                Ok(())
            }
        }
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, run_id = tasks[0].run_id, "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
