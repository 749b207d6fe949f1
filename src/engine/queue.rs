// src/engine/queue.rs

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::engine::{TaskName, TriggerReason};
use crate::types::TriggerWhileRunningBehaviour;

/// One queued future run: task names in first-trigger order, each with the
/// strongest reason seen for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueuedBatch {
    pub triggers: Vec<(TaskName, TriggerReason)>,
}

impl QueuedBatch {
    pub fn new(tasks: Vec<TaskName>, reason: TriggerReason) -> Self {
        let mut batch = Self::default();
        for task in tasks {
            batch.add(task, reason);
        }
        batch
    }

    /// Add a trigger. A task already present keeps its position; a
    /// file-watch reason wins over a manual one.
    pub fn add(&mut self, task: TaskName, reason: TriggerReason) {
        match self.triggers.iter_mut().find(|(name, _)| *name == task) {
            Some((_, existing)) => {
                if reason == TriggerReason::FileWatch {
                    *existing = TriggerReason::FileWatch;
                }
            }
            None => self.triggers.push((task, reason)),
        }
    }

    pub fn merge(&mut self, other: QueuedBatch) {
        for (task, reason) in other.triggers {
            self.add(task, reason);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn tasks(&self) -> Vec<&str> {
        self.triggers.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Triggers that arrive for tasks already participating in the active run.
///
/// Each trigger event becomes its own queued run, up to `max_runs`
/// (`queue_length`) runs. Once that many are waiting, further triggers are
/// merged into the last queued run. Runs are started one at a time, oldest
/// first, whenever the scheduler goes idle.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<QueuedBatch>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of future runs waiting.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Record one trigger event's tasks that are already in the active run.
    ///
    /// - `Queue`: append a new run, or merge into the last one when
    ///   `max_runs` runs are already waiting.
    /// - `Cancel`: replace everything queued with this batch. The running
    ///   task itself is never interrupted.
    pub fn record_batch(&mut self, batch: QueuedBatch) {
        if batch.is_empty() {
            return;
        }

        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                if self.runs.len() < self.max_runs {
                    debug!(tasks = ?batch.tasks(), queued = self.runs.len() + 1, "queued future run");
                    self.runs.push_back(batch);
                } else if let Some(last) = self.runs.back_mut() {
                    warn!(
                        max_runs = self.max_runs,
                        tasks = ?batch.tasks(),
                        "queue_length reached; merging trigger into last queued run"
                    );
                    last.merge(batch);
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                debug!(tasks = ?batch.tasks(), "replacing queued runs with latest trigger (cancel mode)");
                self.runs.clear();
                self.runs.push_back(batch);
            }
        }
    }

    /// Take the oldest queued run, if any.
    pub fn next_batch(&mut self) -> Option<QueuedBatch> {
        let batch = self.runs.pop_front()?;
        debug!(tasks = ?batch.tasks(), remaining = self.runs.len(), "starting queued run");
        Some(batch)
    }
}
