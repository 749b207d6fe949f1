// src/dag/mod.rs

//! Task dependency graph and per-run scheduling.
//!
//! - [`graph`] holds the `after` adjacency of every task.
//! - [`scheduler`] decides which triggered tasks are ready, and propagates
//!   failures to dependents.
//! - [`state_manager`] implements the per-run state transitions.
//! - [`task_info`] / [`scheduler_step`] are the types they exchange.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::DagGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
