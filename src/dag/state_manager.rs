// src/dag/state_manager.rs

//! Per-run state transitions for tasks in the scheduler.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::{TaskName, TriggerReason};

/// Mutable view over the scheduler's task table for one run.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut BTreeMap<TaskName, TaskInfo>,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut BTreeMap<TaskName, TaskInfo>,
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            tasks,
            current_run_id,
        }
    }

    /// Bring a triggered task into this run.
    ///
    /// Any upstream dependency that is not in the run and has never
    /// succeeded is brought in too, so the task is not left waiting on
    /// output that does not exist yet. Downstream dependents are never
    /// added: a trigger runs exactly the task it names.
    ///
    /// A `FileWatch` trigger also marks the task as watch-triggered, so a
    /// failing dependency does not block it.
    ///
    /// Tasks already participating in the run keep their state.
    pub fn mark_triggered_pending(&mut self, root: &str, reason: TriggerReason) {
        if reason == TriggerReason::FileWatch {
            if let Some(info) = self.tasks.get_mut(root) {
                info.watch_triggered = true;
            }
        }

        let mut seen: HashSet<TaskName> = HashSet::new();
        let mut stack: Vec<TaskName> = vec![root.to_string()];
        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }

            let Some(info) = self.tasks.get_mut(&name) else {
                warn!(task = %name, "node in DAG not present in tasks map");
                continue;
            };
            if info.run_state.is_none() {
                info.run_state = Some(RunState::Pending);
                debug!(task = %info.name, ?reason, "marked Pending for this run");
            }

            for dep in self.graph.dependencies_of(&name) {
                let needs_run = self
                    .tasks
                    .get(dep)
                    .is_some_and(|d| d.run_state.is_none() && d.last_successful_run.is_none());
                if needs_run {
                    debug!(task = %name, dep = %dep, "pulling never-built dependency into run");
                    stack.push(dep.clone());
                }
            }
        }
    }

    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        ReadOnlyStateManager::new(self.tasks).deps_satisfied_for_info(info)
    }

    /// Mark every in-run dependent (transitively) of a failed task as
    /// `DoneFailed`. Returns the newly failed names, excluding `failed_task`.
    ///
    /// Watch-triggered dependents stay `Pending` and the walk stops there.
    pub fn mark_dependents_failed(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut newly_failed = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                match info.run_state {
                    Some(RunState::Pending) if info.watch_triggered => {
                        debug!(
                            task = %info.name,
                            upstream = %failed_task,
                            "watch-triggered task runs despite upstream failure"
                        );
                    }
                    Some(RunState::Pending) => {
                        info.run_state = Some(RunState::DoneFailed);
                        debug!(
                            task = %info.name,
                            upstream = %failed_task,
                            "marking dependent as DoneFailed due to upstream failure"
                        );
                        newly_failed.push(info.name.clone());
                        stack.extend(self.graph.dependents_of(&name).iter().cloned());
                    }
                    // A Running dependent cannot exist: it only starts once
                    // every dependency succeeded.
                    Some(RunState::Running)
                    | Some(RunState::DoneSuccess)
                    | Some(RunState::DoneFailed)
                    | None => {}
                }
            }
        }

        newly_failed
    }

    /// Fail every `Pending` task that depends on a task already failed in
    /// this run. Needed when a trigger joins a run after the failure.
    pub fn fail_blocked_pending(&mut self) -> Vec<TaskName> {
        let failed: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| matches!(info.run_state, Some(RunState::DoneFailed)))
            .map(|info| info.name.clone())
            .collect();

        failed
            .iter()
            .flat_map(|name| self.mark_dependents_failed(name))
            .collect()
    }

    /// Mark every `Pending` task whose dependencies are satisfied as
    /// `Running` and return them, in name order.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let candidates: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| {
                matches!(info.run_state, Some(RunState::Pending)) && self.deps_satisfied_for_info(info)
            })
            .map(|info| info.name.clone())
            .collect();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                let is_rerun = info.last_successful_run.is_some() || info.last_failed_run.is_some();
                info!(
                    task = %info.name,
                    run_id = self.current_run_id,
                    rerun = is_rerun,
                    "scheduling task"
                );

                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask::from_task_info(info, self.current_run_id.unwrap_or(0)));
            }
        }

        ready
    }

    pub fn all_tasks_terminal(&self) -> bool {
        !self
            .tasks
            .values()
            .any(|info| matches!(info.run_state, Some(RunState::Pending) | Some(RunState::Running)))
    }
}

/// Shared-borrow counterpart of [`StateManager`] for dependency checks.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a BTreeMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a BTreeMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// A dependency is satisfied when it succeeded in this run, or when it
    /// is not part of this run and has succeeded at some point before.
    ///
    /// For a watch-triggered task a dependency that failed also counts: it
    /// only has to be finished.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_name| {
            let Some(dep) = self.tasks.get(dep_name) else {
                warn!(task = %info.name, dep = %dep_name, "dependency missing from tasks map");
                return false;
            };
            match dep.run_state {
                Some(RunState::DoneSuccess) => true,
                Some(RunState::DoneFailed) => info.watch_triggered,
                Some(RunState::Pending) | Some(RunState::Running) => false,
                None if info.watch_triggered => {
                    dep.last_successful_run.is_some() || dep.last_failed_run.is_some()
                }
                None => dep.last_successful_run.is_some(),
            }
        })
    }
}
