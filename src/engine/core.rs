// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! The core consumes [`RuntimeEvent`]s and produces an updated state plus a
//! list of [`CoreCommand`](crate::engine::CoreCommand)s describing what the
//! IO shell should do next. It has no channels, no Tokio types, and performs
//! no IO, so it can be unit tested directly.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{handle_task_completion, handle_tasks_triggered, CoreStep};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RunSummary, RuntimeEvent, RuntimeOptions};
use crate::types::TriggerWhileRunningBehaviour;

#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
    summary: RunSummary,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(behaviour, queue_length),
            options,
            summary: RunSummary::default(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn into_summary(self) -> RunSummary {
        self.summary
    }

    /// Handle a single runtime event.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TasksTriggered { tasks, reason } => handle_tasks_triggered(
                &mut self.scheduler,
                &mut self.queue,
                &self.options,
                &mut self.summary,
                tasks,
                reason,
            ),
            RuntimeEvent::TaskCompleted { task, outcome } => handle_task_completion(
                &mut self.scheduler,
                &mut self.queue,
                &self.options,
                &mut self.summary,
                task,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
