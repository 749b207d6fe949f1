// src/pipeline/task.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ConfigFile, TaskConfig};
use crate::errors::{Result, SitepipeError};
use crate::fs::FileSystem;
use crate::pipeline::inputs::resolve_inputs;
use crate::pipeline::output::write_outputs;
use crate::transform::{Transform, build_transform};

/// What one successful task run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskReport {
    /// Files matched by the input globs.
    pub inputs: usize,
    /// Files left after the transform chain.
    pub outputs: usize,
    pub written: usize,
    pub unchanged: usize,
}

/// A task ready to run: resolved output directory and built adapters.
#[derive(Debug)]
pub struct TaskPipeline {
    name: String,
    inputs: Vec<String>,
    output: PathBuf,
    transforms: Vec<Box<dyn Transform>>,
}

impl TaskPipeline {
    pub fn from_config(name: &str, cfg: &TaskConfig, root: &Path) -> Result<Self> {
        let transforms = cfg
            .transform
            .iter()
            .map(|t| build_transform(t, root))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            name: name.to_string(),
            inputs: cfg.input.clone(),
            output: PathBuf::from(&cfg.output),
            transforms,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Run the task once against the tree at `root`.
    ///
    /// An empty input set is a no-op. On a transform failure nothing is
    /// written for this run.
    pub fn run(&self, fs: &dyn FileSystem, root: &Path) -> Result<TaskReport> {
        let mut files = resolve_inputs(fs, root, &self.inputs)?;
        let mut report = TaskReport {
            inputs: files.len(),
            ..TaskReport::default()
        };

        if files.is_empty() {
            info!(task = %self.name, "no input files matched; nothing to do");
            return Ok(report);
        }

        for transform in self.transforms.iter() {
            let before = files.len();
            files = transform.apply(files).map_err(|source| SitepipeError::Tool {
                task: self.name.clone(),
                source,
            })?;
            debug!(
                task = %self.name,
                adapter = transform.name(),
                before,
                after = files.len(),
                "applied transform"
            );
        }

        let written = write_outputs(fs, &root.join(&self.output), &files)?;
        report.outputs = files.len();
        report.written = written.written;
        report.unchanged = written.unchanged;

        info!(
            task = %self.name,
            inputs = report.inputs,
            written = report.written,
            unchanged = report.unchanged,
            "task finished"
        );
        Ok(report)
    }
}

/// Every configured task, built once at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, Arc<TaskPipeline>>,
}

impl TaskRegistry {
    pub fn from_config(cfg: &ConfigFile, root: &Path) -> Result<Self> {
        let mut tasks = BTreeMap::new();
        for (name, task) in cfg.tasks().iter() {
            tasks.insert(name.clone(), Arc::new(TaskPipeline::from_config(name, task, root)?));
        }
        Ok(Self { tasks })
    }

    pub fn get(&self, name: &str) -> Option<Arc<TaskPipeline>> {
        self.tasks.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformConfig;
    use crate::fs::mock::MockFileSystem;

    fn task(input: &[&str], output: &str, transform: Vec<TransformConfig>) -> TaskConfig {
        TaskConfig {
            input: input.iter().map(|s| s.to_string()).collect(),
            output: output.to_string(),
            after: Vec::new(),
            transform,
        }
    }

    #[test]
    fn bundles_scripts_in_precedence_order() {
        let fs = MockFileSystem::new();
        fs.add_file("src/js/util.js", "util();");
        fs.add_file("src/js/app.js", "app();");
        fs.add_file("src/js/vendor/lib.js", "lib();");

        let cfg = task(
            &["src/js/**/*.js"],
            "dist/js",
            vec![
                TransformConfig::Order {
                    precedence: vec!["src/js/vendor/**".into(), "src/js/util.js".into()],
                },
                TransformConfig::Concat { file: "site.js".into() },
            ],
        );
        let pipeline = TaskPipeline::from_config("scripts", &cfg, Path::new(".")).unwrap();
        let report = pipeline.run(&fs, Path::new(".")).unwrap();

        assert_eq!(report.inputs, 3);
        assert_eq!(report.written, 1);
        assert_eq!(fs.contents("dist/js/site.js").unwrap(), b"lib();\nutil();\napp();".to_vec());
    }

    #[test]
    fn empty_input_is_a_noop() {
        let fs = MockFileSystem::new();
        let cfg = task(&["src/none/*.js"], "dist", vec![TransformConfig::MinifyJs]);
        let pipeline = TaskPipeline::from_config("none", &cfg, Path::new(".")).unwrap();
        assert_eq!(pipeline.run(&fs, Path::new(".")).unwrap(), TaskReport::default());
        assert!(fs.file_paths().is_empty());
    }

    #[test]
    fn tool_failure_writes_nothing() {
        let fs = MockFileSystem::new();
        fs.add_file("content/ok.j2", "<p>ok</p>");
        fs.add_file("content/bad.j2", "{% if %}");

        let cfg = task(
            &["content/*.j2"],
            "dist",
            vec![TransformConfig::Template {
                pretty: false,
                partials: None,
                extension: "html".into(),
                context: Default::default(),
            }],
        );
        let pipeline = TaskPipeline::from_config("pages", &cfg, Path::new(".")).unwrap();
        let err = pipeline.run(&fs, Path::new(".")).unwrap_err();

        assert!(matches!(err, SitepipeError::Tool { ref task, .. } if task == "pages"));
        assert!(!fs.exists(Path::new("dist/ok.html")));
    }
}
