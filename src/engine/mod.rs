// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the DAG scheduler
//! - the trigger queue (what happens when triggers arrive for tasks that are
//!   already part of the active run)
//! - the runtime event loop that reacts to triggers, task completions and
//!   shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of a task run for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The task failed; carries the rendered error for logs and summaries.
    Failed(String),
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Build targets named on the command line, or the default set.
    Manual,
    /// A watched file changed.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Exit once the DAG is idle and nothing is queued (one-shot builds).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the CLI, the watcher and the
/// executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// These tasks should be triggered together.
    TasksTriggered {
        tasks: Vec<TaskName>,
        reason: TriggerReason,
    },
    /// A task run finished.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Accumulated outcome of every task run handled by a runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: Vec<TaskName>,
    /// Tasks that failed themselves, with their error.
    pub failed: Vec<(TaskName, String)>,
    /// Tasks skipped because a dependency failed.
    pub blocked: Vec<TaskName>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty() || !self.blocked.is_empty()
    }
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use crate::types::TriggerWhileRunningBehaviour;
pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runtime::Runtime;
