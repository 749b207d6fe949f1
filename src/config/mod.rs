// src/config/mod.rs

//! Configuration loading and validation for sitepipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate invariants like DAG correctness and glob syntax (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    CleanSection, ConfigFile, ConfigSection, CssStyle, DeploySection, RawConfigFile,
    ServerSection, TaskConfig, TransformConfig, WatchRuleConfig,
};
