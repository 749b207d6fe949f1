// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `[[watch]]` rules into glob sets.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Turning a change into one trigger for exactly the tasks its rules
//!   declare.

pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use patterns::{WatchRule, WatchRuleSet};
pub use watcher::{WatcherHandle, spawn_watcher};
