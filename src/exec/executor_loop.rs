// src/exec/executor_loop.rs

//! Executor loop that receives scheduled tasks and runs them.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::exec::ExecContext;
use crate::exec::task_runner::run_task;

/// Spawn the background executor loop.
///
/// Each scheduled task runs in its own Tokio task. Per task name there is
/// never more than one run at a time: a task scheduled while its previous
/// run is still going waits for that run to finish first.
pub fn spawn_executor(ctx: ExecContext, runtime_tx: mpsc::Sender<RuntimeEvent>) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<String, JoinHandle<()>> = HashMap::new();

        while let Some(task) = rx.recv().await {
            active.retain(|_, handle| !handle.is_finished());

            let previous = active.remove(&task.name);
            if previous.is_some() {
                debug!(
                    task = %task.name,
                    run_id = task.run_id,
                    "previous run still active; new run will wait for it"
                );
            }

            let name = task.name.clone();
            let ctx = ctx.clone();
            let rt_tx = runtime_tx.clone();
            let handle = tokio::spawn(async move {
                if let Some(previous) = previous {
                    let _ = previous.await;
                }
                run_task(task, ctx, rt_tx).await;
            });
            active.insert(name, handle);
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
