// src/watch/event_handler.rs

//! Turn filesystem change events into task triggers.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, TaskName, TriggerReason};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchRuleSet;

/// Whether an event can change file contents. Pure reads are ignored.
pub fn is_relevant(event: &Event) -> bool {
    !matches!(event.kind, EventKind::Access(_))
}

/// Tasks to trigger for a batch of changed paths: every matching rule's
/// declared tasks, in rule order, each named once.
pub fn tasks_for_paths(root: &Path, paths: &[PathBuf], rules: &WatchRuleSet) -> Vec<TaskName> {
    let mut matched: Vec<TaskName> = Vec::new();

    for path in paths {
        let Some(rel) = relative_str(root, path) else {
            warn!("could not relativize path {:?} against root {:?}", path, root);
            continue;
        };

        let tasks = rules.on_file_change(&rel);
        if !tasks.is_empty() {
            debug!(rel = %rel, ?tasks, "watch rules matched");
        }
        for task in tasks {
            if !matched.contains(&task) {
                matched.push(task);
            }
        }
    }

    matched
}

/// Process one notify event: match its paths and send a single
/// `TasksTriggered` for everything it touches.
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_file_change(
    root: &Path,
    event: Event,
    rules: &WatchRuleSet,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    if !is_relevant(&event) {
        return true;
    }

    let tasks = tasks_for_paths(root, &event.paths, rules);
    if tasks.is_empty() {
        return true;
    }

    debug!(?tasks, "triggering watch rule tasks for change");
    if let Err(err) = runtime_tx
        .send(RuntimeEvent::TasksTriggered {
            tasks,
            reason: TriggerReason::FileWatch,
        })
        .await
    {
        warn!("failed to send RuntimeEvent::TasksTriggered: {err}");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatchRuleConfig;
    use notify::event::{AccessKind, ModifyKind};

    fn rules() -> WatchRuleSet {
        let mut set = WatchRuleSet::new(&[
            WatchRuleConfig {
                paths: vec!["src/scss/**".into()],
                exclude: vec![],
                tasks: vec!["styles".into(), "pages".into()],
            },
            WatchRuleConfig {
                paths: vec!["content/**".into()],
                exclude: vec![],
                tasks: vec!["pages".into()],
            },
        ])
        .unwrap();
        set.ignore_dir("dist");
        set
    }

    #[tokio::test]
    async fn modify_event_sends_one_batch_of_declared_tasks() {
        let (tx, mut rx) = mpsc::channel(4);
        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/site/src/scss/main.scss"))
            .add_path(PathBuf::from("/site/content/index.j2"));

        assert!(process_file_change(Path::new("/site"), event, &rules(), &tx).await);

        match rx.try_recv().unwrap() {
            RuntimeEvent::TasksTriggered { tasks, reason } => {
                assert_eq!(tasks, ["styles", "pages"]);
                assert_eq!(reason, TriggerReason::FileWatch);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn access_events_and_output_writes_are_ignored() {
        let (tx, mut rx) = mpsc::channel(4);
        let read = Event::new(EventKind::Access(AccessKind::Any))
            .add_path(PathBuf::from("/site/content/index.j2"));
        let output = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/site/dist/index.html"));

        process_file_change(Path::new("/site"), read, &rules(), &tx).await;
        process_file_change(Path::new("/site"), output, &rules(), &tx).await;
        assert!(rx.try_recv().is_err());
    }
}
