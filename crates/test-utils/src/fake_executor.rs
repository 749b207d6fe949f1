use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use sitepipe::dag::ScheduledTask;
use sitepipe::engine::{RuntimeEvent, TaskOutcome};
use sitepipe::errors::Result;
use sitepipe::exec::ExecutorBackend;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were "run", in dispatch order
/// - immediately reports `TaskCompleted` for each scheduled task, failing
///   the ones registered with [`FakeExecutor::fail_task`].
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    pub fn fail_task(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for t in tasks {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(t.name.clone());
                }

                let outcome = if failing.contains(&t.name) {
                    TaskOutcome::Failed(format!("{} failed", t.name))
                } else {
                    TaskOutcome::Success
                };

                tx.send(RuntimeEvent::TaskCompleted {
                    task: t.name.clone(),
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
