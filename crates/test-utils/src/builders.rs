#![allow(dead_code)]

use sitepipe::config::{
    ConfigFile, RawConfigFile, TaskConfig, TransformConfig, WatchRuleConfig,
};
use sitepipe::types::{FailurePolicy, TriggerWhileRunningBehaviour};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_watch(mut self, paths: &[&str], tasks: &[&str]) -> Self {
        self.config.watch.push(WatchRuleConfig {
            paths: strings(paths),
            exclude: Vec::new(),
            tasks: strings(tasks),
        });
        self
    }

    pub fn with_default(mut self, tasks: &[&str]) -> Self {
        self.config.config.default = strings(tasks);
        self
    }

    pub fn on_task_failure(mut self, policy: FailurePolicy) -> Self {
        self.config.config.on_task_failure = policy;
        self
    }

    pub fn trigger_behaviour(mut self, behaviour: TriggerWhileRunningBehaviour, queue_length: usize) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self.config.config.queue_length = queue_length;
        self
    }

    /// The unvalidated config, for tests that expect validation to fail.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
///
/// Starts with a single `rename` transform so the task validates; the first
/// explicit `transform` call replaces it.
pub struct TaskConfigBuilder {
    task: TaskConfig,
    placeholder_transform: bool,
}

impl TaskConfigBuilder {
    pub fn new(output: &str) -> Self {
        Self {
            task: TaskConfig {
                input: vec![],
                output: output.to_string(),
                after: vec![],
                transform: vec![TransformConfig::Rename {
                    to: "out.txt".to_string(),
                }],
            },
            placeholder_transform: true,
        }
    }

    pub fn input(mut self, pattern: &str) -> Self {
        self.task.input.push(pattern.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn transform(mut self, transform: TransformConfig) -> Self {
        if self.placeholder_transform {
            self.task.transform.clear();
            self.placeholder_transform = false;
        }
        self.task.transform.push(transform);
        self
    }

    pub fn no_transforms(mut self) -> Self {
        self.task.transform.clear();
        self.placeholder_transform = false;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
