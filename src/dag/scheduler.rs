// src/dag/scheduler.rs

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome, TriggerReason};

/// Scheduler holds the immutable DAG plus mutable per-run state.
///
/// It is responsible for:
/// - remembering which tasks are part of the current run
/// - deciding when a triggered task is ready (deps satisfied)
/// - failing dependents when a task fails
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: BTreeMap<TaskName, TaskInfo>,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` when idle.
    current_run_id: Option<u64>,
}

impl Scheduler {
    /// Construct a scheduler from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::from_graph(DagGraph::from_config(cfg))
    }

    pub fn from_graph(graph: DagGraph) -> Self {
        let tasks = graph
            .tasks()
            .map(|name| {
                let deps = graph.dependencies_of(name).to_vec();
                (name.to_string(), TaskInfo::new(name.to_string(), deps))
            })
            .collect();

        Self {
            graph,
            tasks,
            run_counter: 0,
            current_run_id: None,
        }
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// Read-only view of the given task's run state; `None` for unknown tasks.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Names of tasks participating in the active run (empty when idle).
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if self.current_run_id.is_none() {
            return Vec::new();
        }

        self.tasks
            .values()
            .filter(|info| info.run_state.is_some())
            .map(|info| info.name.clone())
            .collect()
    }

    /// Whether the dependencies of `task` are satisfied for the current run.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        Some(ReadOnlyStateManager::new(&self.tasks).deps_satisfied_for_info(info))
    }

    /// Start a new run, resetting per-run state but keeping success history.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);

        for info in self.tasks.values_mut() {
            info.run_state = None;
            info.watch_triggered = false;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new run");
    }

    /// Trigger a task; returns the tasks that became ready.
    pub fn handle_trigger(&mut self, task: &str, reason: TriggerReason) -> Vec<ScheduledTask> {
        self.step_trigger(task, reason).newly_scheduled
    }

    /// Record a task's completion; returns the tasks that became ready.
    pub fn handle_completion(&mut self, task: &str, outcome: &TaskOutcome) -> Vec<ScheduledTask> {
        self.step_completion(task, outcome).newly_scheduled
    }

    pub fn step_trigger(&mut self, task: &str, reason: TriggerReason) -> SchedulerStep {
        if self.current_run_id.is_none() {
            warn!(task = %task, "trigger with no active run; implicitly starting a new run");
            self.start_new_run();
        }

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        if self.graph.contains(task) {
            manager.mark_triggered_pending(task, reason);
        } else {
            warn!(task = %task, "trigger for unknown task; ignoring");
        }
        let newly_blocked = manager.fail_blocked_pending();
        let newly_scheduled = manager.collect_new_ready_tasks();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_blocked,
            run_just_finished,
        }
    }

    pub fn step_completion(&mut self, task: &str, outcome: &TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "completion with no active run; ignoring");
            return SchedulerStep::default();
        };

        let mut step = SchedulerStep::default();

        match self.tasks.get_mut(task) {
            Some(info) => match outcome {
                TaskOutcome::Success => {
                    info.run_state = Some(RunState::DoneSuccess);
                    info.last_successful_run = Some(run_id);
                    debug!(task = %info.name, run_id, "task completed successfully");
                    let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                    step.newly_scheduled = manager.collect_new_ready_tasks();
                }
                TaskOutcome::Failed(reason) => {
                    info.run_state = Some(RunState::DoneFailed);
                    info.last_failed_run = Some(run_id);
                    warn!(
                        task = %info.name,
                        run_id,
                        error = %reason,
                        "task failed; failing dependents in this run"
                    );
                    let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                    step.newly_blocked = manager.mark_dependents_failed(task);
                    step.newly_scheduled = manager.collect_new_ready_tasks();
                }
            },
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        step.run_just_finished = self.maybe_finish_run();
        step
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tasks()
    }

    /// Clear `current_run_id` once every task is terminal. Returns `true`
    /// if this call moved the scheduler to idle.
    fn maybe_finish_run(&mut self) -> bool {
        if self.current_run_id.is_none() {
            return false;
        }

        let manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        if manager.all_tasks_terminal() {
            info!(run_id = self.current_run_id, "scheduler: all tasks terminal; run finished");
            self.current_run_id = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> Scheduler {
        // styles -> pages -> sitemap, scripts standalone
        Scheduler::from_graph(DagGraph::from_edges([
            ("styles".to_string(), vec![]),
            ("pages".to_string(), vec!["styles".to_string()]),
            ("sitemap".to_string(), vec!["pages".to_string()]),
            ("scripts".to_string(), vec![]),
        ]))
    }

    fn names(tasks: &[ScheduledTask]) -> Vec<&str> {
        tasks.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn manual_trigger_pulls_unbuilt_dependencies_only() {
        let mut s = scheduler();
        s.start_new_run();
        let ready = s.handle_trigger("pages", TriggerReason::Manual);

        assert_eq!(names(&ready), ["styles"]);
        assert_eq!(s.run_state_of("pages"), Some(TaskRunState::Pending));
        assert_eq!(s.run_state_of("sitemap"), Some(TaskRunState::NotInRun));

        let ready = s.handle_completion("styles", &TaskOutcome::Success);
        assert_eq!(names(&ready), ["pages"]);
        s.handle_completion("pages", &TaskOutcome::Success);
        assert!(s.is_idle());
    }

    #[test]
    fn built_dependencies_are_not_rerun_on_manual_trigger() {
        let mut s = scheduler();
        s.start_new_run();
        s.handle_trigger("styles", TriggerReason::Manual);
        s.handle_completion("styles", &TaskOutcome::Success);
        assert!(s.is_idle());

        s.start_new_run();
        let ready = s.handle_trigger("pages", TriggerReason::Manual);
        assert_eq!(names(&ready), ["pages"]);
    }

    #[test]
    fn file_watch_trigger_runs_only_the_named_task() {
        let mut s = scheduler();
        s.start_new_run();
        s.handle_trigger("styles", TriggerReason::Manual);
        s.handle_completion("styles", &TaskOutcome::Success);
        s.start_new_run();
        s.handle_trigger("pages", TriggerReason::Manual);
        s.handle_completion("pages", &TaskOutcome::Success);

        s.start_new_run();
        let ready = s.handle_trigger("styles", TriggerReason::FileWatch);
        assert_eq!(names(&ready), ["styles"]);
        assert_eq!(s.run_state_of("pages"), Some(TaskRunState::NotInRun));
        assert_eq!(s.run_state_of("sitemap"), Some(TaskRunState::NotInRun));

        s.handle_completion("styles", &TaskOutcome::Success);
        assert!(s.is_idle());
    }

    #[test]
    fn failure_blocks_dependents_and_finishes_run() {
        let mut s = scheduler();
        s.start_new_run();
        s.handle_trigger("sitemap", TriggerReason::Manual);
        s.handle_trigger("scripts", TriggerReason::Manual);

        let step = s.step_completion("styles", &TaskOutcome::Failed("sass: boom".into()));
        assert_eq!(step.newly_blocked.len(), 2);
        assert!(!step.run_just_finished);

        let step = s.step_completion("scripts", &TaskOutcome::Success);
        assert!(step.run_just_finished);
        assert_eq!(s.run_state_of("sitemap"), Some(TaskRunState::DoneFailed));
    }

    #[test]
    fn watch_triggered_task_runs_after_a_failed_dependency() {
        let mut s = scheduler();
        s.start_new_run();
        let ready = s.handle_trigger("styles", TriggerReason::FileWatch);
        assert_eq!(names(&ready), ["styles"]);
        let ready = s.handle_trigger("pages", TriggerReason::FileWatch);
        assert!(ready.is_empty());

        let step = s.step_completion("styles", &TaskOutcome::Failed("sass: boom".into()));
        assert!(step.newly_blocked.is_empty());
        assert_eq!(names(&step.newly_scheduled), ["pages"]);

        s.handle_completion("pages", &TaskOutcome::Success);
        assert!(s.is_idle());
        assert_eq!(s.run_state_of("sitemap"), Some(TaskRunState::NotInRun));
    }

    #[test]
    fn trigger_after_upstream_failure_does_not_hang() {
        let mut s = scheduler();
        s.start_new_run();
        s.handle_trigger("styles", TriggerReason::Manual);
        s.handle_trigger("scripts", TriggerReason::Manual);
        s.handle_completion("styles", &TaskOutcome::Failed("x".into()));

        let step = s.step_trigger("pages", TriggerReason::Manual);
        assert_eq!(step.newly_blocked, vec!["pages".to_string()]);
        s.handle_completion("scripts", &TaskOutcome::Success);
        assert!(s.is_idle());
    }
}
