// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::GlobSet;

use crate::config::{ConfigFile, WatchRuleConfig};
use crate::engine::TaskName;
use crate::pipeline::globs::{build_globset, normalize_pattern, slash_path};

/// One compiled `[[watch]]` rule.
#[derive(Clone)]
pub struct WatchRule {
    paths: GlobSet,
    exclude: Option<GlobSet>,
    tasks: Vec<TaskName>,
}

impl fmt::Debug for WatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRule")
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl WatchRule {
    pub fn compile(cfg: &WatchRuleConfig) -> Result<Self> {
        let paths = build_globset(&cfg.paths)
            .with_context(|| format!("building watch globset for tasks {:?}", cfg.tasks))?;
        let exclude = if cfg.exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(&cfg.exclude)
                    .with_context(|| format!("building exclude globset for tasks {:?}", cfg.tasks))?,
            )
        };

        Ok(Self {
            paths,
            exclude,
            tasks: cfg.tasks.clone(),
        })
    }

    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    /// Whether a path relative to the project root (forward slashes) is
    /// watched by this rule.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.paths.is_match(rel_path) {
            return false;
        }
        match &self.exclude {
            Some(exclude) => !exclude.is_match(rel_path),
            None => true,
        }
    }
}

/// Every watch rule of a project, plus directories whose changes are never
/// considered (the build root, so writing output does not retrigger tasks).
#[derive(Debug, Clone, Default)]
pub struct WatchRuleSet {
    rules: Vec<WatchRule>,
    ignored_prefixes: Vec<String>,
}

impl WatchRuleSet {
    pub fn new(rules: &[WatchRuleConfig]) -> Result<Self> {
        let rules = rules.iter().map(WatchRule::compile).collect::<Result<Vec<_>>>()?;
        Ok(Self {
            rules,
            ignored_prefixes: Vec::new(),
        })
    }

    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut set = Self::new(cfg.watch_rules())?;
        set.ignore_dir(&slash_path(cfg.build_root()));
        Ok(set)
    }

    pub fn ignore_dir(&mut self, dir: &str) {
        let dir = normalize_pattern(dir);
        let dir = dir.trim_end_matches('/');
        if !dir.is_empty() {
            self.ignored_prefixes.push(format!("{dir}/"));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    /// Tasks to trigger for a changed path: the tasks of every matching
    /// rule, in rule order then declared order, each listed once.
    pub fn on_file_change(&self, rel_path: &str) -> Vec<TaskName> {
        let rel_path = normalize_pattern(rel_path);
        if self.ignored_prefixes.iter().any(|p| rel_path.starts_with(p.as_str())) {
            return Vec::new();
        }

        let mut tasks: Vec<TaskName> = Vec::new();
        for rule in self.rules.iter().filter(|r| r.matches(&rel_path)) {
            for task in rule.tasks() {
                if !tasks.contains(task) {
                    tasks.push(task.clone());
                }
            }
        }
        tasks
    }
}
