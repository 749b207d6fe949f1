// src/pipeline/mod.rs

//! Task execution: read inputs, run the transform chain, write outputs.
//!
//! - [`globs`]: pattern helpers shared with watch, clean and deploy.
//! - [`inputs`]: glob resolution into [`FileRecord`]s.
//! - [`record`]: the [`FileRecord`] type itself.
//! - [`output`]: change-aware output writer.
//! - [`task`]: [`TaskPipeline`] and the [`TaskRegistry`] built from config.

pub mod globs;
pub mod inputs;
pub mod output;
pub mod record;
pub mod task;

pub use record::FileRecord;
pub use task::{TaskPipeline, TaskRegistry, TaskReport};
