// tests/scheduler_property.rs

use std::collections::HashSet;

use proptest::prelude::*;
use sitepipe::config::ConfigFile;
use sitepipe::dag::Scheduler;
use sitepipe::engine::{
    CoreCommand, CoreRuntime, CoreStep, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use sitepipe_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};

// Acyclic by construction: task N may only depend on tasks 0..N-1.
fn dag_config_strategy(max_tasks: usize) -> impl Strategy<Value = ConfigFile> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let deps_strat = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        );

        deps_strat.prop_map(move |raw_deps| {
            let mut builder = ConfigFileBuilder::new();
            for (i, potential_deps) in raw_deps.into_iter().enumerate() {
                let name = format!("task_{i}");
                let mut task_builder = TaskConfigBuilder::new(&format!("dist/{name}"));

                let valid_deps: HashSet<usize> = potential_deps
                    .into_iter()
                    .filter(|_| i > 0)
                    .map(|d| d % i.max(1))
                    .collect();
                for dep_idx in valid_deps {
                    task_builder = task_builder.after(&format!("task_{dep_idx}"));
                }
                builder = builder.with_task(&name, task_builder.build());
            }
            builder.build()
        })
    })
}

fn dispatched(step: &CoreStep) -> Vec<String> {
    step.commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::DispatchTasks(tasks) => Some(tasks.iter().map(|t| t.name.clone())),
            CoreCommand::RequestExit => None,
        })
        .flatten()
        .collect()
}

fn pick(names: &[String], indices: &[usize]) -> Vec<String> {
    indices.iter().map(|&i| names[i % names.len()].clone()).collect()
}

proptest! {
    /// Whatever the graph, triggers and failures, a one-shot runtime never
    /// runs a task twice at once and always drains to idle and exits.
    #[test]
    fn runtime_always_drains_and_exits(
        cfg in dag_config_strategy(8),
        initial in proptest::collection::vec(any::<usize>(), 1..4),
        retriggers in proptest::collection::vec(any::<usize>(), 0..6),
        failing in proptest::collection::vec(any::<usize>(), 0..3),
        cancel in any::<bool>(),
    ) {
        let scheduler = Scheduler::from_config(&cfg);
        let names: Vec<String> = scheduler.task_names().map(str::to_string).collect();
        let failing: HashSet<String> = pick(&names, &failing).into_iter().collect();
        let mut retriggers = pick(&names, &retriggers);

        let behaviour = if cancel {
            TriggerWhileRunningBehaviour::Cancel
        } else {
            TriggerWhileRunningBehaviour::Queue
        };
        let mut core = CoreRuntime::new(
            scheduler,
            behaviour,
            2,
            RuntimeOptions { exit_when_idle: true },
        );

        let step = core.step(RuntimeEvent::TasksTriggered {
            tasks: pick(&names, &initial),
            reason: TriggerReason::Manual,
        });
        let mut executing = dispatched(&step);
        let mut exited = !step.keep_running;

        let mut steps = 0;
        while !executing.is_empty() {
            steps += 1;
            prop_assert!(steps < 1_000, "simulation did not converge");

            let mut seen = HashSet::new();
            for task in executing.iter() {
                prop_assert!(seen.insert(task.clone()), "{} dispatched twice concurrently", task);
            }

            if let Some(task) = retriggers.pop() {
                let step = core.step(RuntimeEvent::TasksTriggered {
                    tasks: vec![task],
                    reason: TriggerReason::FileWatch,
                });
                executing.extend(dispatched(&step));
                exited |= !step.keep_running;
                continue;
            }

            let task = executing.remove(0);
            let outcome = if failing.contains(&task) {
                TaskOutcome::Failed(format!("{task} failed"))
            } else {
                TaskOutcome::Success
            };
            let step = core.step(RuntimeEvent::TaskCompleted { task, outcome });
            executing.extend(dispatched(&step));
            exited |= !step.keep_running;
        }

        prop_assert!(core.is_idle(), "runtime stuck with nothing executing");
        prop_assert!(core.queue_is_empty());
        prop_assert!(exited, "one-shot runtime never requested exit");
    }
}
