// src/exec/mod.rs

//! Task execution layer.
//!
//! Runs scheduled tasks' pipelines and reports back to the orchestration
//! runtime via `RuntimeEvent`s.
//!
//! - [`executor_loop`] owns the loop that receives scheduled tasks.
//! - [`task_runner`] runs one task on the blocking pool.
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `RealExecutorBackend`; tests substitute their own backend.

use std::path::PathBuf;
use std::sync::Arc;

use crate::fs::FileSystem;
use crate::pipeline::TaskRegistry;
use crate::serve::LiveReload;

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;

/// Everything a task run needs besides the task itself.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub registry: TaskRegistry,
    pub fs: Arc<dyn FileSystem>,
    /// Project root; task globs and outputs are relative to it.
    pub root: PathBuf,
    /// Signalled after every successful task when serving.
    pub reload: Option<LiveReload>,
}
