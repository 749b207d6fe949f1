// src/dag/scheduler_step.rs

use crate::dag::task_info::ScheduledTask;
use crate::engine::TaskName;

/// Structured result of a single scheduler step.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready to run.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Dependents newly marked failed because an upstream task failed. The
    /// failing task itself is not included.
    pub newly_blocked: Vec<TaskName>,
    /// Whether this step finished the current run.
    pub run_just_finished: bool,
}
