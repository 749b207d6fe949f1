use std::str::FromStr;
use serde::Deserialize;

/// Behaviour when a task is triggered again while it is already part of the
/// active run.
///
/// - `Queue`: remember the trigger and start a new run when the current one
///   finishes (default behaviour).
/// - `Cancel`: drop any previously queued run and only keep the latest
///   trigger. Running tasks are never interrupted; only queued triggers are
///   affected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "cancel" => Ok(TriggerWhileRunningBehaviour::Cancel),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"cancel\")"
            )),
        }
    }
}

/// What a one-shot build reports when a task failed.
///
/// Failed tasks are always logged and never abort the other tasks of the
/// run. This only decides the process exit status of `sitepipe build`;
/// watch mode keeps running regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Exit with a non-zero status if any task failed.
    #[default]
    Fail,
    /// Log failures and exit zero anyway.
    Continue,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(FailurePolicy::Fail),
            "continue" => Ok(FailurePolicy::Continue),
            other => Err(format!(
                "invalid on_task_failure: {other} (expected \"fail\" or \"continue\")"
            )),
        }
    }
}
