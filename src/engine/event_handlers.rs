// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use crate::dag::{ScheduledTask, Scheduler, SchedulerStep, TaskRunState};
use crate::engine::queue::{QueuedBatch, TriggerQueue};
use crate::engine::{RunSummary, RuntimeOptions, TaskName, TaskOutcome, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// The process should exit (one-shot builds, once idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Handle a batch of triggers.
///
/// - Idle scheduler: start a new run seeded with the oldest queued run (if
///   any) plus this batch.
/// - Active run: tasks not yet in the run are merged into it immediately;
///   tasks already in it are queued together as one future run, so one task
///   never runs twice at once.
pub fn handle_tasks_triggered(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    summary: &mut RunSummary,
    tasks: Vec<TaskName>,
    reason: TriggerReason,
) -> CoreStep {
    let mut commands = Vec::new();

    if scheduler.is_idle() {
        let mut batch = queue.next_batch().unwrap_or_default();
        batch.merge(QueuedBatch::new(tasks, reason));
        commands.extend(start_new_run_from_triggers(scheduler, summary, batch));
    } else {
        let mut ready = Vec::new();
        let mut deferred = Vec::new();
        for task in tasks {
            match scheduler.run_state_of(&task) {
                // Unknown task; validated configs never produce one.
                None => {}
                Some(TaskRunState::NotInRun) => {
                    let step = scheduler.step_trigger(&task, reason);
                    ready.extend(absorb(summary, step));
                }
                Some(_already_in_run) => deferred.push(task),
            }
        }
        queue.record_batch(QueuedBatch::new(deferred, reason));
        if !ready.is_empty() {
            commands.push(CoreCommand::DispatchTasks(ready));
        }
    }

    start_queued_runs(scheduler, queue, summary, &mut commands);
    finish(scheduler, queue, options, commands)
}

/// Handle a task completion event.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    summary: &mut RunSummary,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    let step = scheduler.step_completion(&task, &outcome);
    match outcome {
        TaskOutcome::Success => summary.succeeded.push(task),
        TaskOutcome::Failed(reason) => summary.failed.push((task, reason)),
    }

    let newly_ready = absorb(summary, step);
    if !newly_ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(newly_ready));
    }

    start_queued_runs(scheduler, queue, summary, &mut commands);
    finish(scheduler, queue, options, commands)
}

/// Start a fresh run from a batch of triggers. Pure: returns commands
/// instead of performing IO.
pub fn start_new_run_from_triggers(
    scheduler: &mut Scheduler,
    summary: &mut RunSummary,
    batch: QueuedBatch,
) -> Vec<CoreCommand> {
    if batch.is_empty() {
        return Vec::new();
    }

    scheduler.start_new_run();

    let mut all_ready = Vec::new();
    for (task, reason) in batch.triggers.iter() {
        let step = scheduler.step_trigger(task, *reason);
        all_ready.extend(absorb(summary, step));
    }

    if all_ready.is_empty() {
        Vec::new()
    } else {
        vec![CoreCommand::DispatchTasks(all_ready)]
    }
}

/// While the scheduler is idle, start the next queued run. A run that ends
/// without dispatching anything (every task blocked) moves on to the next.
fn start_queued_runs(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    summary: &mut RunSummary,
    commands: &mut Vec<CoreCommand>,
) {
    while scheduler.is_idle() {
        let Some(batch) = queue.next_batch() else {
            break;
        };
        commands.extend(start_new_run_from_triggers(scheduler, summary, batch));
    }
}

fn absorb(summary: &mut RunSummary, step: SchedulerStep) -> Vec<ScheduledTask> {
    summary.blocked.extend(step.newly_blocked);
    step.newly_scheduled
}

/// Append `RequestExit` when a one-shot runtime has nothing left to do.
fn finish(
    scheduler: &Scheduler,
    queue: &TriggerQueue,
    options: &RuntimeOptions,
    mut commands: Vec<CoreCommand>,
) -> CoreStep {
    let done = options.exit_when_idle && scheduler.is_idle() && queue.is_empty();
    if done {
        commands.push(CoreCommand::RequestExit);
    }
    CoreStep {
        commands,
        keep_running: !done,
    }
}
