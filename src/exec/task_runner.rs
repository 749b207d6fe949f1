// src/exec/task_runner.rs

//! Run a single task and report its outcome.

use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::errors::SitepipeError;
use crate::exec::ExecContext;
use crate::pipeline::TaskReport;

/// Run `task`'s pipeline on the blocking pool, then send `TaskCompleted`.
///
/// Errors never escape: they are logged and reported as
/// `TaskOutcome::Failed`.
pub async fn run_task(task: ScheduledTask, ctx: ExecContext, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let started = Instant::now();
    info!(task = %task.name, run_id = task.run_id, "starting task");

    let outcome = match execute(&task, &ctx).await {
        Ok(report) => {
            info!(
                task = %task.name,
                run_id = task.run_id,
                written = report.written,
                unchanged = report.unchanged,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "task succeeded"
            );
            if let Some(reload) = &ctx.reload {
                reload.notify(&task.name);
            }
            TaskOutcome::Success
        }
        Err(err) => {
            error!(task = %task.name, run_id = task.run_id, error = %err, "task failed");
            TaskOutcome::Failed(err.to_string())
        }
    };

    if let Err(err) = runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
    {
        error!(task = %task.name, "sending TaskCompleted to runtime: {err}");
    }
}

async fn execute(task: &ScheduledTask, ctx: &ExecContext) -> Result<TaskReport, SitepipeError> {
    let pipeline = ctx
        .registry
        .get(&task.name)
        .ok_or_else(|| SitepipeError::TaskNotFound(task.name.clone()))?;
    let fs = ctx.fs.clone();
    let root = ctx.root.clone();

    tokio::task::spawn_blocking(move || pipeline.run(fs.as_ref(), &root))
        .await
        .map_err(|e| SitepipeError::Other(anyhow::anyhow!("task '{}' panicked: {e}", task.name)))?
}
