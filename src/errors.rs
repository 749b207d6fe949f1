// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

/// Diagnostic produced when a transform adapter rejects its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{adapter}: {message}")]
pub struct ToolError {
    /// Name of the adapter that failed (e.g. `"sass"`).
    pub adapter: String,
    /// The underlying tool's diagnostic message.
    pub message: String,
}

impl ToolError {
    pub fn new(adapter: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            adapter: adapter.into(),
            message: message.into(),
        }
    }
}

/// Connection, authentication or IO failure while deploying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransferError {
    pub message: String,
}

impl TransferError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SitepipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Tool error in task '{task}': {source}")]
    Tool {
        task: String,
        #[source]
        source: ToolError,
    },

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SitepipeError>;
